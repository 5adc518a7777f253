//! NoCheatZ Core - Hook Dispatch and Detection Systems
//!
//! This crate contains everything between the host boundary and the
//! detection logic:
//!
//! - [`gamedata`] - vtable slot resolution from `config.ini`
//! - [`hooks`] - vtable patching, trampolines, dispatchers and listener registries
//! - [`players`] - player slot status and per-player storage
//! - [`systems`] - detection systems and their activation
//! - [`runtime`] - the composition root driven by the plugin exports
//!
//! # Re-exports
//!
//! This crate re-exports the SDK and engine crates for convenience:
//! - [`sdk`] - Source engine types and layouts
//! - [`engine`] - The host boundary

pub use ncz_engine as engine;
pub use ncz_sdk as sdk;

#[doc(hidden)]
pub use tracing as __tracing;

pub mod config;
pub mod convars;
pub mod gamedata;
pub mod hooks;
pub mod players;
pub mod runtime;
pub mod systems;

#[cfg(all(test, not(all(windows, target_arch = "x86"))))]
pub(crate) mod testing;

/// Log a broken host contract and panic
///
/// Hooked calls run inside `extern` trampolines, where the panic aborts the
/// process instead of continuing with corrupt state.
#[macro_export]
macro_rules! contract_violation {
    ($($arg:tt)+) => {{
        $crate::__tracing::error!("Contract violation: {}", format_args!($($arg)+));
        panic!($($arg)+)
    }};
}

// Re-export commonly used items
pub use config::{ConfigError, ConfigResult, CoreConfig};
pub use convars::ConVar;
pub use gamedata::{GameConfig, GamedataError, SlotTable, TargetIdentity};
pub use hooks::{
    Buttons, GroundStateEvent, HookSet, ListenerKey, ListenerRegistry, Observer, PatchError,
    RunCommandEvent, VTablePatchEngine, WeaponDropEvent, WeaponEquipEvent,
};
pub use players::{EntityIndex, PlayerRef, PlayerTable, SlotStatus};
pub use runtime::Runtime;
pub use systems::{BhopBlocker, System, SystemError, SystemManager};
