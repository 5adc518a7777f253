//! Player slots
//!
//! The server has a fixed number of player slots, addressed by entity index
//! `1..=MAX_PLAYERS`. [`PlayerTable`] tracks the connection status of each
//! slot and the game entity behind it; dispatchers use it through the
//! [`PlayerDirectory`] trait to turn a hooked `this` pointer into a
//! [`PlayerRef`].

mod store;
mod table;

use std::ffi::c_void;
use std::fmt;

pub use store::PlayerDataStore;
pub use table::PlayerTable;

/// Maximum number of player slots
pub const MAX_PLAYERS: usize = 64;

/// Entity index of a player slot, always in `1..=MAX_PLAYERS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityIndex(u16);

impl EntityIndex {
    pub fn new(index: usize) -> Option<Self> {
        (1..=MAX_PLAYERS).contains(&index).then_some(Self(index as u16))
    }

    /// Convert an index received over FFI
    pub fn from_raw(index: i32) -> Option<Self> {
        usize::try_from(index).ok().and_then(Self::new)
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Every valid player index, in ascending order
    pub fn all() -> impl Iterator<Item = EntityIndex> {
        (1..=MAX_PLAYERS).map(|i| Self(i as u16))
    }
}

impl fmt::Display for EntityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection status of a player slot
///
/// Ordered: a listener registered with a minimum status receives events for
/// players at that status or above.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotStatus {
    #[default]
    Invalid,
    Kicked,
    Bot,
    PlayerConnecting,
    PlayerConnected,
    /// Connected long enough to be subject to detections
    PlayerInTests,
}

impl SlotStatus {
    pub fn is_human(self) -> bool {
        self >= SlotStatus::PlayerConnecting
    }
}

/// Snapshot of a player slot handed to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerRef {
    pub index: EntityIndex,
    pub status: SlotStatus,
}

/// Which players an iteration visits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessFilter {
    /// Every occupied slot
    All,
    /// Humans that are connecting or further along
    HumanAtLeastConnecting,
    /// Humans currently being tested
    InTests,
}

impl ProcessFilter {
    pub fn matches(self, status: SlotStatus) -> bool {
        match self {
            ProcessFilter::All => status > SlotStatus::Kicked,
            ProcessFilter::HumanAtLeastConnecting => status.is_human(),
            ProcessFilter::InTests => status == SlotStatus::PlayerInTests,
        }
    }
}

/// Read access to the player slots
pub trait PlayerDirectory: Send + Sync {
    /// Player whose game entity is `entity`
    fn lookup_entity(&self, entity: *const c_void) -> Option<PlayerRef>;

    fn get(&self, index: EntityIndex) -> Option<PlayerRef>;

    /// Snapshot of the players matching `filter`, ordered by index
    fn players(&self, filter: ProcessFilter) -> Vec<PlayerRef>;

    fn any(&self, filter: ProcessFilter) -> bool {
        !self.players(filter).is_empty()
    }
}
