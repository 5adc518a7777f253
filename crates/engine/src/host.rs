//! Host collaborator types
//!
//! Everything the plugin needs from the running game is expressed through
//! the [`Host`] trait so that the hook framework and the detection systems
//! can be driven by a fake host in tests.

use std::ffi::c_void;
use std::fmt;
use std::path::Path;
use std::ptr::NonNull;

use ncz_sdk::{ConVar, Edict, HostBuild};

/// Server simulation tick counter
///
/// The only clock detection logic may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameTick(pub i32);

impl GameTick {
    /// Number of ticks elapsed since `earlier`
    pub fn ticks_since(self, earlier: GameTick) -> i32 {
        self.0.wrapping_sub(earlier.0)
    }
}

impl fmt::Display for GameTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-null reference to an engine `edict_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdictRef(NonNull<Edict>);

// SAFETY: edicts live in the engine's static edict array for the whole map;
// the pointer is only dereferenced by the host on the game thread.
unsafe impl Send for EdictRef {}
unsafe impl Sync for EdictRef {}

impl EdictRef {
    /// Wrap a raw edict pointer, `None` if null
    pub fn from_ptr(ptr: *mut Edict) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut Edict {
        self.0.as_ptr()
    }
}

/// Non-null pointer to a server entity object (`IServerUnknown` / `CBaseEntity`)
///
/// This is the object whose vtable the hooks patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityPtr(NonNull<c_void>);

// SAFETY: Only compared by address or handed back to the host / patch engine
// on the game thread.
unsafe impl Send for EntityPtr {}
unsafe impl Sync for EntityPtr {}

impl EntityPtr {
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

/// Handle to an engine console variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConVarHandle(NonNull<ConVar>);

// SAFETY: ConVar objects are registered for the engine's lifetime.
unsafe impl Send for ConVarHandle {}
unsafe impl Sync for ConVarHandle {}

impl ConVarHandle {
    pub fn from_ptr(ptr: *mut ConVar) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut ConVar {
        self.0.as_ptr()
    }
}

/// Which game binary we are running inside
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameIdentity {
    /// Game directory name, e.g. `csgo` (config.ini section name)
    pub game: String,
    /// Binary family, selects struct layouts
    pub build: HostBuild,
}

impl GameIdentity {
    pub fn new(game: impl Into<String>, build: HostBuild) -> Self {
        Self {
            game: game.into(),
            build,
        }
    }
}

/// Services provided by the running game
pub trait Host: Send + Sync {
    /// Game identity used for config section lookup
    fn identity(&self) -> &GameIdentity;

    /// Absolute or server-relative game directory
    fn game_dir(&self) -> &Path;

    /// Current `gpGlobals->tickcount`
    fn tick_count(&self) -> GameTick;

    /// Seconds per tick, re-read on every call
    fn tick_interval(&self) -> f32;

    /// `ICvar::FindVar`
    fn find_convar(&self, name: &str) -> Option<ConVarHandle>;

    /// `ConVar::GetBool`, read live
    fn convar_bool(&self, convar: ConVarHandle) -> bool;

    /// Edict is in use and backed by a server entity
    fn is_valid_edict(&self, edict: EdictRef) -> bool;

    /// `edict->GetUnknown()`
    fn edict_to_entity(&self, edict: EdictRef) -> Option<EntityPtr>;

    /// `CBaseEntity*` to its edict (`serverGameEnts->BaseEntityToEdict`)
    fn entity_to_edict(&self, entity: *mut c_void) -> Option<EdictRef>;
}
