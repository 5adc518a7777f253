//! Tracing subscriber setup
//!
//! The subscriber is installed first thing on load, before the host table is
//! validated, at info level. Once `core.toml` is read its `debug` switch is
//! applied through a reload handle.

use std::sync::OnceLock;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install the global subscriber once
pub(crate) fn init() {
    if FILTER.get().is_some() {
        return;
    }

    let (filter, handle) = reload::Layer::new(filter(false));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .is_ok();

    if installed {
        let _ = FILTER.set(handle);
    }
}

/// Apply the `debug` switch from core.toml
///
/// `RUST_LOG` takes precedence over it.
pub(crate) fn set_debug(debug: bool) {
    let Some(handle) = FILTER.get() else {
        return;
    };
    if let Err(e) = handle.reload(filter(debug)) {
        tracing::warn!("Failed to apply log level: {}", e);
    }
}

fn filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(debug)))
}

fn default_directives(debug: bool) -> &'static str {
    if debug {
        "info,ncz_core=debug,ncz_engine=debug,nocheatz=debug"
    } else {
        "info"
    }
}
