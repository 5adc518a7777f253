//! [`Host`] implementation over the shim's C function table

use std::ffi::{c_char, c_void, CString};
use std::path::{Path, PathBuf};
use std::thread::ThreadId;

use ncz_sdk::{ConVar, Edict, IServerUnknown};

use crate::host::{ConVarHandle, EdictRef, EntityPtr, GameIdentity, GameTick, Host};

/// Validated function pointers from [`crate::HostApi`]
#[derive(Debug)]
pub(crate) struct HostFns {
    pub tick_count: extern "C" fn() -> i32,
    pub tick_interval: extern "C" fn() -> f32,
    pub find_convar: unsafe extern "C" fn(*const c_char) -> *mut ConVar,
    pub convar_get_bool: unsafe extern "C" fn(*mut ConVar) -> bool,
    pub edict_is_valid: unsafe extern "C" fn(*mut Edict) -> bool,
    pub edict_to_entity: unsafe extern "C" fn(*mut Edict) -> *mut IServerUnknown,
    pub entity_to_edict: unsafe extern "C" fn(*mut c_void) -> *mut Edict,
}

/// Host backed by the native shim
#[derive(Debug)]
pub struct FfiHost {
    fns: HostFns,
    identity: GameIdentity,
    game_dir: PathBuf,

    /// Thread the plugin was loaded on (the game thread)
    main_thread_id: ThreadId,
}

impl FfiHost {
    pub(crate) fn new(fns: HostFns, identity: GameIdentity, game_dir: PathBuf) -> Self {
        Self {
            fns,
            identity,
            game_dir,
            main_thread_id: std::thread::current().id(),
        }
    }

    /// Check if current thread is the main game thread
    pub fn is_main_thread(&self) -> bool {
        std::thread::current().id() == self.main_thread_id
    }
}

impl Host for FfiHost {
    fn identity(&self) -> &GameIdentity {
        &self.identity
    }

    fn game_dir(&self) -> &Path {
        &self.game_dir
    }

    fn tick_count(&self) -> GameTick {
        GameTick((self.fns.tick_count)())
    }

    fn tick_interval(&self) -> f32 {
        (self.fns.tick_interval)()
    }

    fn find_convar(&self, name: &str) -> Option<ConVarHandle> {
        let name = CString::new(name).ok()?;
        // SAFETY: name is a valid C string for the duration of the call
        let ptr = unsafe { (self.fns.find_convar)(name.as_ptr()) };
        ConVarHandle::from_ptr(ptr)
    }

    fn convar_bool(&self, convar: ConVarHandle) -> bool {
        // SAFETY: handle came from find_convar and convars are never freed
        unsafe { (self.fns.convar_get_bool)(convar.as_ptr()) }
    }

    fn is_valid_edict(&self, edict: EdictRef) -> bool {
        unsafe { (self.fns.edict_is_valid)(edict.as_ptr()) }
    }

    fn edict_to_entity(&self, edict: EdictRef) -> Option<EntityPtr> {
        let unk = unsafe { (self.fns.edict_to_entity)(edict.as_ptr()) };
        EntityPtr::from_ptr(unk as *mut c_void)
    }

    fn entity_to_edict(&self, entity: *mut c_void) -> Option<EdictRef> {
        if entity.is_null() {
            return None;
        }
        EdictRef::from_ptr(unsafe { (self.fns.entity_to_edict)(entity) })
    }
}
