//! NoCheatZ Engine - Host Boundary
//!
//! This crate handles:
//! - The [`Host`] trait: everything the plugin asks of the running game
//! - Loading the host function table handed over by the native shim
//! - [`FfiHost`], the [`Host`] implementation backed by that table
//!
//! # Architecture
//!
//! The native shim fills a [`HostApi`] table and passes it to the plugin's
//! load export. [`load_host`] validates it and returns an [`FfiHost`], which
//! the composition root shares with every component as `Arc<dyn Host>`.
//! Tests substitute their own [`Host`] implementation.

pub mod error;
pub mod ffi;
pub mod host;
pub mod loader;

pub use error::HostError;
pub use ffi::FfiHost;
pub use host::{ConVarHandle, EdictRef, EntityPtr, GameIdentity, GameTick, Host};
pub use loader::{load_host, HostApi, HOST_API_VERSION};
