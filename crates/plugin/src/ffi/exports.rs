//! C-compatible exports called by the native shim

use std::ffi::{c_char, c_int, CStr};
use std::sync::Arc;

use tracing::instrument;

use ncz_core::config::core_config_path;
use ncz_core::{CoreConfig, Runtime};
use ncz_engine::{load_host, Host, HostApi};
use ncz_sdk::Edict;

use super::PluginState;

// Plugin metadata - static strings with null terminators for C compatibility
static AUTHOR: &[u8] = b"NoCheatZ contributors\0";
static NAME: &[u8] = b"NoCheatZ\0";
static DESCRIPTION: &[u8] = b"Server-side anti-cheat for Source engine games\0";
static LICENSE: &[u8] = b"Apache-2.0\0";
static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
static LOG_TAG: &[u8] = b"NOCHEATZ\0";

/// Called when the shim loads the plugin
///
/// # Safety
/// - `api` must be null or point to a [`HostApi`] that outlives the plugin
/// - `error` must be a valid pointer to a buffer of at least `maxlen` bytes, or null
#[no_mangle]
#[instrument(skip_all)]
pub unsafe extern "C" fn ncz_plugin_load(
    api: *const HostApi,
    error: *mut c_char,
    maxlen: usize,
) -> bool {
    crate::logging::init();

    // A reload replaces the previous runtime; restore its patches first
    drop(super::take());

    let host = match load_host(api) {
        Ok(host) => Arc::new(host),
        Err(e) => {
            write_error(error, maxlen, &format!("Host error: {}", e));
            return false;
        }
    };

    let core_path = core_config_path(host.game_dir());
    let (config, config_error) = match CoreConfig::load(&core_path) {
        Ok(config) => (config, None),
        Err(e) => (CoreConfig::default(), Some(e)),
    };

    crate::logging::set_debug(config.debug);

    tracing::info!(
        "NoCheatZ {} loading for {} ({:?})",
        env!("CARGO_PKG_VERSION"),
        host.identity().game,
        host.identity().build
    );
    if let Some(e) = config_error {
        tracing::warn!("Using default core config, {:?} unusable: {}", core_path, e);
    }

    let shared: Arc<dyn Host> = host.clone();
    let runtime = Runtime::new(shared, config);
    super::install(PluginState { host, runtime });

    tracing::info!("Main thread ID: {:?}", std::thread::current().id());
    true
}

/// Called when the shim unloads the plugin
///
/// # Safety
/// - `error` must be a valid pointer to a buffer of at least `maxlen` bytes, or null
#[no_mangle]
#[instrument(skip_all)]
pub unsafe extern "C" fn ncz_plugin_unload(error: *mut c_char, maxlen: usize) -> bool {
    tracing::info!("NoCheatZ unloading...");

    match std::panic::catch_unwind(|| drop(super::take())) {
        Ok(()) => true,
        Err(_) => {
            write_error(error, maxlen, "Panic during shutdown");
            false
        }
    }
}

/// Called when a client starts connecting
///
/// # Safety
/// - `name` must be a valid null-terminated C string or null
#[no_mangle]
pub unsafe extern "C" fn ncz_on_client_connect(index: c_int, name: *const c_char, is_bot: bool) {
    let name = c_str(name);
    super::with_runtime("ClientConnect", |runtime| {
        runtime.on_client_connect(index, &name, is_bot)
    });
}

/// Called when a client's entity is in the game
///
/// # Safety
/// - `edict` must be the client's edict or null
#[no_mangle]
pub unsafe extern "C" fn ncz_on_client_active(index: c_int, edict: *mut Edict) {
    super::with_runtime("ClientActive", |runtime| {
        runtime.on_client_active(index, edict)
    });
}

/// Called when a client disconnects
#[no_mangle]
pub extern "C" fn ncz_on_client_disconnect(index: c_int) {
    super::with_runtime("ClientDisconnect", |runtime| {
        runtime.on_client_disconnect(index)
    });
}

/// Called every server frame
#[no_mangle]
pub extern "C" fn ncz_on_game_frame(simulating: bool) {
    super::with_runtime("GameFrame", |runtime| runtime.on_game_frame(simulating));
}

// Metadata exports - these return static strings for the shim to display

#[no_mangle]
pub extern "C" fn ncz_get_author() -> *const c_char {
    AUTHOR.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn ncz_get_name() -> *const c_char {
    NAME.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn ncz_get_description() -> *const c_char {
    DESCRIPTION.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn ncz_get_license() -> *const c_char {
    LICENSE.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn ncz_get_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

#[no_mangle]
pub extern "C" fn ncz_get_log_tag() -> *const c_char {
    LOG_TAG.as_ptr() as *const c_char
}

/// Owned copy of a C string; null reads as empty
unsafe fn c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Helper to write an error message to a C buffer
///
/// # Safety
/// - `error` must be a valid pointer or null
/// - `maxlen` must accurately reflect the buffer size
unsafe fn write_error(error: *mut c_char, maxlen: usize, msg: &str) {
    if !error.is_null() && maxlen > 0 {
        let bytes = msg.as_bytes();
        let len = bytes.len().min(maxlen - 1);
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), error as *mut u8, len);
        *error.add(len) = 0;
    }
}
