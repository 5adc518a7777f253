//! ConVar access
//!
//! Detection systems read server convars such as `sv_enablebunnyhopping`
//! live, on every use, so a server operator can flip them at runtime.
//!
//! # Example
//!
//! ```ignore
//! use ncz_core::convars::ConVar;
//!
//! if let Some(cheats) = ConVar::find(&host, "sv_cheats") {
//!     if cheats.get_bool() {
//!         tracing::warn!("Cheats are enabled!");
//!     }
//! }
//! ```

mod convar;

pub use convar::{ConVar, LiveFlag};
