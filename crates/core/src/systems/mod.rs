//! Detection systems
//!
//! A [`System`] subscribes to dispatcher events while it has something to
//! do. The [`SystemManager`] asks every enabled system each frame whether it
//! [has a job](System::got_job) and loads or unloads it when the answer
//! changes. Systems listed in config.ini's `disable_systems` never load.

mod bhop_blocker;

use std::sync::Arc;

use thiserror::Error;

use crate::hooks::{HookSet, ListenerError};
use crate::players::EntityIndex;

pub use bhop_blocker::{blocking_window_ticks, BhopBlocker, JumpInfo, JumpState};

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("{system} needs the {hook} hook, which is not available")]
    MissingHook {
        system: &'static str,
        hook: &'static str,
    },

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

pub trait System: Send + Sync {
    fn name(&self) -> &'static str;

    /// Register listeners with the dispatchers this system needs
    fn load(self: Arc<Self>, hooks: &HookSet) -> Result<(), SystemError>;

    /// Deregister everything `load` registered
    fn unload(&self, hooks: &HookSet);

    /// Whether the system has anything to do right now
    fn got_job(&self) -> bool;

    /// A player slot was connected or freed
    fn reset_player(&self, _index: EntityIndex) {}
}

struct SystemEntry {
    system: Arc<dyn System>,
    disabled: bool,
    active: bool,
}

/// Owns every system in registration order
#[derive(Default)]
pub struct SystemManager {
    entries: Vec<SystemEntry>,
}

impl SystemManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, system: Arc<dyn System>) {
        tracing::debug!("Registered system {}", system.name());
        self.entries.push(SystemEntry {
            system,
            disabled: false,
            active: false,
        });
    }

    /// Case-insensitive lookup
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<dyn System>> {
        self.entry(name).map(|entry| &entry.system)
    }

    fn entry(&self, name: &str) -> Option<&SystemEntry> {
        self.entries
            .iter()
            .find(|entry| entry.system.name().eq_ignore_ascii_case(name))
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut SystemEntry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.system.name().eq_ignore_ascii_case(name))
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|entry| entry.active)
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|entry| entry.disabled)
    }

    /// Apply config.ini's `disable_systems` list
    pub fn disable_from_config(&mut self, names: &[String], hooks: &HookSet) {
        for name in names {
            match self.entry_mut(name) {
                Some(entry) => {
                    entry.disabled = true;
                    if entry.active {
                        entry.system.unload(hooks);
                        entry.active = false;
                    }
                    tracing::info!("Disabled system {}", entry.system.name());
                }
                None => tracing::error!("Unable to disable system {}: system not known", name),
            }
        }
    }

    /// Per-frame activation check
    pub fn think(&mut self, hooks: &HookSet) {
        for entry in self.entries.iter_mut().filter(|entry| !entry.disabled) {
            let wanted = entry.system.got_job();
            if wanted == entry.active {
                continue;
            }

            if wanted {
                match entry.system.clone().load(hooks) {
                    Ok(()) => {
                        entry.active = true;
                        tracing::info!("Loaded system {}", entry.system.name());
                    }
                    Err(e) => {
                        // Stay inert; undo any partial registration
                        entry.system.unload(hooks);
                        entry.disabled = true;
                        tracing::error!("Unable to load system {}: {}", entry.system.name(), e);
                    }
                }
            } else {
                entry.system.unload(hooks);
                entry.active = false;
                tracing::info!("Unloaded system {}", entry.system.name());
            }
        }
    }

    pub fn reset_player(&self, index: EntityIndex) {
        for entry in &self.entries {
            entry.system.reset_player(index);
        }
    }

    pub fn unload_all(&mut self, hooks: &HookSet) {
        for entry in self.entries.iter_mut().filter(|entry| entry.active) {
            entry.system.unload(hooks);
            entry.active = false;
            tracing::info!("Unloaded system {}", entry.system.name());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
