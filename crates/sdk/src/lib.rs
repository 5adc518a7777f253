//! NoCheatZ SDK - Source Engine Type Definitions
//!
//! This crate contains the host-side types the plugin touches: opaque
//! engine objects, the command-buffer layouts read by the run-command hook,
//! and the game identities the configuration is keyed by.
//! It has no dependencies.
//!
//! # Modules
//!
//! - [`interfaces`] - Opaque C++ object types and small value types
//! - [`usercmd`] - `CUserCmd` layouts per host build and input buttons
//! - [`versions`] - Host build variants and known game identities

pub mod interfaces;
pub mod usercmd;
pub mod versions;

pub use interfaces::*;
pub use usercmd::*;
pub use versions::{HostBuild, KNOWN_GAMES};
