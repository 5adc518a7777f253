//! Host ConVar wrapper

use std::fmt;
use std::sync::Arc;

use ncz_engine::{ConVarHandle, Host};

/// A game convar found through the host
#[derive(Clone)]
pub struct ConVar {
    handle: ConVarHandle,
    /// Cached name for log messages
    name: String,
    host: Arc<dyn Host>,
}

impl ConVar {
    /// Find a ConVar by name
    ///
    /// Returns None if the ConVar doesn't exist.
    pub fn find(host: &Arc<dyn Host>, name: &str) -> Option<Self> {
        let handle = host.find_convar(name)?;
        Some(Self {
            handle,
            name: name.to_string(),
            host: Arc::clone(host),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> ConVarHandle {
        self.handle
    }

    /// Current value, read from the host every call
    pub fn get_bool(&self) -> bool {
        self.host.convar_bool(self.handle)
    }
}

impl fmt::Debug for ConVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConVar")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish()
    }
}

/// A boolean convar that may not exist on every game
///
/// A missing convar is logged once at construction and reads as `false`.
#[derive(Debug, Clone)]
pub struct LiveFlag {
    name: &'static str,
    convar: Option<ConVar>,
}

impl LiveFlag {
    pub fn find(host: &Arc<dyn Host>, name: &'static str, owner: &str) -> Self {
        let convar = ConVar::find(host, name);
        if convar.is_none() {
            tracing::warn!("{}: unable to find convar {}, treating it as 0", owner, name);
        }
        Self { name, convar }
    }

    /// Flag that is known not to exist on this game
    pub fn absent(name: &'static str) -> Self {
        Self { name, convar: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn exists(&self) -> bool {
        self.convar.is_some()
    }

    pub fn get(&self) -> bool {
        self.convar.as_ref().is_some_and(ConVar::get_bool)
    }
}
