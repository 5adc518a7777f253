//! NoCheatZ Plugin - FFI Layer
//!
//! This crate provides the FFI boundary between the native server shim and
//! the Rust core logic. It compiles to a cdylib (.so/.dll).
//!
//! The shim hands over a [`HostApi`](ncz_engine::HostApi) table on load and
//! then forwards the server's client lifecycle and frame callbacks.

pub mod ffi;
mod logging;
