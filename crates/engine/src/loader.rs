//! Host function table loading
//!
//! The native shim owns every engine interface. It hands the plugin a
//! [`HostApi`] table of plain C functions at load time; nothing else crosses
//! the boundary in that direction.

use std::ffi::{c_char, c_void};
use std::path::PathBuf;

use ncz_sdk::{versions::KNOWN_GAMES, ConVar, Edict, HostBuild, IServerUnknown};

use crate::error::HostError;
use crate::ffi::{FfiHost, HostFns};
use crate::host::GameIdentity;

/// Layout version of [`HostApi`]; bumped whenever a field is added
pub const HOST_API_VERSION: u32 = 1;

/// Game directory buffer size (MAX_PATH)
const GAME_DIR_BUFFER: usize = 260;

/// Function table filled by the native shim
#[repr(C)]
pub struct HostApi {
    /// Must equal [`HOST_API_VERSION`]
    pub version: u32,
    /// Raw [`HostBuild`] discriminant
    pub build: i32,
    /// Writes the game directory into `buf` and returns its length
    pub game_dir: Option<unsafe extern "C" fn(buf: *mut c_char, maxlen: usize) -> usize>,
    pub tick_count: Option<extern "C" fn() -> i32>,
    pub tick_interval: Option<extern "C" fn() -> f32>,
    pub find_convar: Option<unsafe extern "C" fn(name: *const c_char) -> *mut ConVar>,
    pub convar_get_bool: Option<unsafe extern "C" fn(convar: *mut ConVar) -> bool>,
    pub edict_is_valid: Option<unsafe extern "C" fn(edict: *mut Edict) -> bool>,
    pub edict_to_entity: Option<unsafe extern "C" fn(edict: *mut Edict) -> *mut IServerUnknown>,
    pub entity_to_edict: Option<unsafe extern "C" fn(entity: *mut c_void) -> *mut Edict>,
}

fn required<T>(f: Option<T>, name: &'static str) -> Result<T, HostError> {
    f.ok_or(HostError::MissingFunction(name))
}

/// Validate the shim's function table and build the host
///
/// # Safety
/// `api` must be null or point to a fully initialized [`HostApi`] whose
/// function pointers stay callable for the plugin's lifetime.
#[tracing::instrument(skip_all)]
pub unsafe fn load_host(api: *const HostApi) -> Result<FfiHost, HostError> {
    let api = api.as_ref().ok_or(HostError::NullTable)?;

    if api.version != HOST_API_VERSION {
        return Err(HostError::VersionMismatch {
            expected: HOST_API_VERSION,
            actual: api.version,
        });
    }

    let fns = HostFns {
        tick_count: required(api.tick_count, "tick_count")?,
        tick_interval: required(api.tick_interval, "tick_interval")?,
        find_convar: required(api.find_convar, "find_convar")?,
        convar_get_bool: required(api.convar_get_bool, "convar_get_bool")?,
        edict_is_valid: required(api.edict_is_valid, "edict_is_valid")?,
        edict_to_entity: required(api.edict_to_entity, "edict_to_entity")?,
        entity_to_edict: required(api.entity_to_edict, "entity_to_edict")?,
    };
    let game_dir_fn = required(api.game_dir, "game_dir")?;

    let mut buf = [0u8; GAME_DIR_BUFFER];
    let len = game_dir_fn(buf.as_mut_ptr() as *mut c_char, buf.len()).min(buf.len());
    let raw = &buf[..len];
    let raw = raw.split(|&b| b == 0).next().unwrap_or(raw);
    let game_dir = std::str::from_utf8(raw)
        .map_err(|_| HostError::InvalidGameDir(String::from_utf8_lossy(raw).into_owned()))?;
    if game_dir.is_empty() {
        return Err(HostError::InvalidGameDir(String::new()));
    }

    let build = HostBuild::from_raw(api.build).ok_or(HostError::UnknownBuild(api.build))?;
    let game_dir = PathBuf::from(game_dir);
    let game = game_name_from_dir(&game_dir)?;

    if !KNOWN_GAMES.iter().any(|(known, _)| known.eq_ignore_ascii_case(&game)) {
        tracing::warn!("Game '{}' has no section in the shipped config.ini", game);
    }

    tracing::info!("Host: game={} build={:?} dir={:?}", game, build, game_dir);

    Ok(FfiHost::new(fns, GameIdentity::new(game, build), game_dir))
}

/// Section name is the last component of the game directory
fn game_name_from_dir(dir: &std::path::Path) -> Result<String, HostError> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or_else(|| HostError::InvalidGameDir(dir.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "C" fn game_dir(buf: *mut c_char, maxlen: usize) -> usize {
        let dir = b"/srv/srcds/csgo";
        let len = dir.len().min(maxlen);
        std::ptr::copy_nonoverlapping(dir.as_ptr(), buf as *mut u8, len);
        len
    }
    extern "C" fn tick_count() -> i32 {
        42
    }
    extern "C" fn tick_interval() -> f32 {
        0.015625
    }
    unsafe extern "C" fn find_convar(_name: *const c_char) -> *mut ConVar {
        std::ptr::null_mut()
    }
    unsafe extern "C" fn convar_get_bool(_convar: *mut ConVar) -> bool {
        false
    }
    unsafe extern "C" fn edict_is_valid(edict: *mut Edict) -> bool {
        !edict.is_null()
    }
    unsafe extern "C" fn edict_to_entity(_edict: *mut Edict) -> *mut IServerUnknown {
        std::ptr::null_mut()
    }
    unsafe extern "C" fn entity_to_edict(_entity: *mut c_void) -> *mut Edict {
        std::ptr::null_mut()
    }

    fn full_api() -> HostApi {
        HostApi {
            version: HOST_API_VERSION,
            build: HostBuild::CounterStrikeGlobalOffensive as i32,
            game_dir: Some(game_dir),
            tick_count: Some(tick_count),
            tick_interval: Some(tick_interval),
            find_convar: Some(find_convar),
            convar_get_bool: Some(convar_get_bool),
            edict_is_valid: Some(edict_is_valid),
            edict_to_entity: Some(edict_to_entity),
            entity_to_edict: Some(entity_to_edict),
        }
    }

    #[test]
    fn test_load_host() {
        use crate::host::Host;

        let api = full_api();
        let host = unsafe { load_host(&api) }.unwrap();
        assert_eq!(host.identity().game, "csgo");
        assert_eq!(host.identity().build, HostBuild::CounterStrikeGlobalOffensive);
        assert_eq!(host.tick_count().0, 42);
        assert!(host.find_convar("sv_enablebunnyhopping").is_none());
    }

    #[test]
    fn test_missing_function_rejected() {
        let mut api = full_api();
        api.tick_interval = None;
        let err = unsafe { load_host(&api) }.unwrap_err();
        assert!(matches!(err, HostError::MissingFunction("tick_interval")));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut api = full_api();
        api.version = HOST_API_VERSION + 1;
        let err = unsafe { load_host(&api) }.unwrap_err();
        assert!(matches!(err, HostError::VersionMismatch { .. }));
    }

    #[test]
    fn test_null_table_rejected() {
        let err = unsafe { load_host(std::ptr::null()) }.unwrap_err();
        assert!(matches!(err, HostError::NullTable));
    }
}
