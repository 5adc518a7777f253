use std::ffi::c_void;

use ncz_engine::{EdictRef, EntityPtr, GameTick};
use parking_lot::RwLock;

use super::{EntityIndex, PlayerDirectory, PlayerRef, ProcessFilter, SlotStatus, MAX_PLAYERS};

#[derive(Debug, Clone, Default)]
struct PlayerSlot {
    status: SlotStatus,
    name: String,
    edict: Option<EdictRef>,
    entity: Option<EntityPtr>,
    /// Tick the player entered the game
    active_since: GameTick,
}

/// Status and entity of every player slot
pub struct PlayerTable {
    slots: RwLock<Vec<PlayerSlot>>,
}

impl PlayerTable {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(vec![PlayerSlot::default(); MAX_PLAYERS + 1]),
        }
    }

    /// A client started connecting
    pub fn connect(&self, index: EntityIndex, name: &str, is_bot: bool) -> PlayerRef {
        let status = if is_bot {
            SlotStatus::Bot
        } else {
            SlotStatus::PlayerConnecting
        };

        self.slots.write()[index.get()] = PlayerSlot {
            status,
            name: name.to_string(),
            ..PlayerSlot::default()
        };

        tracing::debug!("Player slot {} ({}) -> {:?}", index, name, status);
        PlayerRef { index, status }
    }

    /// The client's entity is in the game
    ///
    /// Returns `None` if the slot was never connected.
    pub fn activate(
        &self,
        index: EntityIndex,
        edict: EdictRef,
        entity: EntityPtr,
        now: GameTick,
    ) -> Option<PlayerRef> {
        let mut slots = self.slots.write();
        let slot = &mut slots[index.get()];

        match slot.status {
            SlotStatus::Invalid | SlotStatus::Kicked => return None,
            SlotStatus::PlayerConnecting => slot.status = SlotStatus::PlayerConnected,
            _ => {}
        }
        slot.edict = Some(edict);
        slot.entity = Some(entity);
        slot.active_since = now;

        tracing::debug!("Player slot {} ({}) active at tick {}", index, slot.name, now);
        Some(PlayerRef {
            index,
            status: slot.status,
        })
    }

    pub fn disconnect(&self, index: EntityIndex) {
        let mut slots = self.slots.write();
        let slot = &mut slots[index.get()];
        if slot.status != SlotStatus::Invalid {
            tracing::debug!("Player slot {} ({}) disconnected", index, slot.name);
        }
        *slot = PlayerSlot::default();
    }

    /// Move connected players that have been in game for `delay_ticks` into tests
    pub fn promote(&self, now: GameTick, delay_ticks: i32) -> Vec<PlayerRef> {
        let mut promoted = Vec::new();
        let mut slots = self.slots.write();

        for index in EntityIndex::all() {
            let slot = &mut slots[index.get()];
            if slot.status == SlotStatus::PlayerConnected
                && now.ticks_since(slot.active_since) >= delay_ticks
            {
                slot.status = SlotStatus::PlayerInTests;
                tracing::info!("Player {} ({}) is now in tests", index, slot.name);
                promoted.push(PlayerRef {
                    index,
                    status: slot.status,
                });
            }
        }

        promoted
    }

    pub fn entity(&self, index: EntityIndex) -> Option<EntityPtr> {
        self.slots.read()[index.get()].entity
    }

    pub fn edict(&self, index: EntityIndex) -> Option<EdictRef> {
        self.slots.read()[index.get()].edict
    }

    pub fn name(&self, index: EntityIndex) -> String {
        self.slots.read()[index.get()].name.clone()
    }
}

impl Default for PlayerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerDirectory for PlayerTable {
    fn lookup_entity(&self, entity: *const c_void) -> Option<PlayerRef> {
        if entity.is_null() {
            return None;
        }
        let slots = self.slots.read();
        EntityIndex::all().find_map(|index| {
            let slot = &slots[index.get()];
            match slot.entity {
                Some(ptr) if ptr.addr() == entity as usize && slot.status > SlotStatus::Kicked => {
                    Some(PlayerRef {
                        index,
                        status: slot.status,
                    })
                }
                _ => None,
            }
        })
    }

    fn get(&self, index: EntityIndex) -> Option<PlayerRef> {
        let status = self.slots.read()[index.get()].status;
        (status != SlotStatus::Invalid).then_some(PlayerRef { index, status })
    }

    fn players(&self, filter: ProcessFilter) -> Vec<PlayerRef> {
        let slots = self.slots.read();
        EntityIndex::all()
            .filter_map(|index| {
                let status = slots[index.get()].status;
                filter.matches(status).then_some(PlayerRef { index, status })
            })
            .collect()
    }
}
