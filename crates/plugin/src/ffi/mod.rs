//! C ABI surface
//!
//! - [`exports`] - `#[no_mangle]` functions called by the native shim
//! - plugin state shared between them

pub mod exports;

use std::sync::{Arc, LazyLock};

use ncz_core::Runtime;
use ncz_engine::FfiHost;
use parking_lot::Mutex;

/// Everything alive between load and unload
pub(crate) struct PluginState {
    pub host: Arc<FfiHost>,
    pub runtime: Runtime,
}

static STATE: LazyLock<Mutex<Option<PluginState>>> = LazyLock::new(|| Mutex::new(None));

pub(crate) fn install(state: PluginState) {
    *STATE.lock() = Some(state);
}

pub(crate) fn take() -> Option<PluginState> {
    STATE.lock().take()
}

/// Run `f` against the loaded runtime, if any
pub(crate) fn with_runtime(context: &str, f: impl FnOnce(&mut Runtime)) {
    let mut state = STATE.lock();
    let Some(state) = state.as_mut() else {
        tracing::trace!("{} before load, ignoring", context);
        return;
    };
    if !state.host.is_main_thread() {
        tracing::error!("{} called off the game thread", context);
        return;
    }
    f(&mut state.runtime);
}
