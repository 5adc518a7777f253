//! Ground entity change hook
//!
//! The game notifies the player entity whenever `m_hGroundEntity` changes.
//! An invalid handle means the player left the ground.

use std::ffi::c_void;
use std::sync::{Arc, LazyLock};

use ncz_engine::{EdictRef, Host};
use ncz_sdk::INVALID_EHANDLE_INDEX;
use parking_lot::Mutex;

use super::abi;
use super::cell::DispatcherCell;
use super::events::GroundStateEvent;
use super::registry::{ListenerRegistry, Observer};
use super::vtable::{PatchError, VTablePatchEngine};
use crate::gamedata::{slots, GamedataError, SlotTable, TargetIdentity};
use crate::players::{PlayerDirectory, SlotStatus};

pub(crate) static GROUND_HOOKS: LazyLock<DispatcherCell<GroundStateDispatcher>> =
    LazyLock::new(DispatcherCell::new);

pub type GroundRegistry = ListenerRegistry<dyn Observer<GroundStateEvent>>;

pub struct GroundStateDispatcher {
    host: Arc<dyn Host>,
    players: Arc<dyn PlayerDirectory>,
    slot: usize,
    patches: Mutex<VTablePatchEngine>,
    listeners: GroundRegistry,
}

impl GroundStateDispatcher {
    pub const NAME: &'static str = "OnGroundHookListener";

    pub fn new(
        host: Arc<dyn Host>,
        players: Arc<dyn PlayerDirectory>,
        slots: &SlotTable,
    ) -> Result<Self, GamedataError> {
        let target = TargetIdentity::current(host.identity());
        let slot = slots.resolve(slots::GROUND_ENTITY, &target)?;

        Ok(Self {
            host,
            players,
            slot,
            patches: Mutex::new(VTablePatchEngine::new(Self::NAME)),
            listeners: ListenerRegistry::new("GroundEntity"),
        })
    }

    pub fn listeners(&self) -> &GroundRegistry {
        &self.listeners
    }

    pub fn hook_player(&self, edict: EdictRef) -> Result<usize, PatchError> {
        let entity = super::expect_entity(&*self.host, edict, Self::NAME);
        super::install_all(
            &self.patches,
            entity,
            &[("GroundEntityChanged", self.slot, abi::ground_entity_trampoline as *const ())],
        )
    }

    pub fn unhook_all(&self) -> usize {
        self.patches.lock().uninstall_all()
    }

    pub fn patch_count(&self) -> usize {
        self.patches.lock().len()
    }

    /// Ground entity of `this` changed to `*handle`
    ///
    /// # Safety
    /// `this` must be the hooked object; `handle` null or readable.
    pub unsafe fn ground_entity_changed(&self, this: *mut c_void, handle: *const u32) {
        if !handle.is_null() {
            if let Some(player) = self.players.lookup_entity(this) {
                if player.status > SlotStatus::PlayerConnecting {
                    let mut event = GroundStateEvent {
                        player,
                        on_ground: *handle != INVALID_EHANDLE_INDEX,
                    };
                    self.listeners
                        .for_each(|listener, _| listener.on_event(&mut event));
                }
            }
        }

        let original = super::original_for(
            &self.patches,
            this,
            self.slot,
            abi::ground_entity_trampoline as *const (),
            "GroundEntityChanged",
        );
        abi::call_ground_entity(original, this, handle);
    }
}

pub(crate) unsafe fn ground_entity_hook(this: *mut c_void, handle: *const u32) {
    match GROUND_HOOKS.get() {
        Some(dispatcher) => dispatcher.ground_entity_changed(this, handle),
        None => {
            let original = super::saved_original_for(
                this,
                abi::ground_entity_trampoline as *const (),
                "GroundEntityChanged",
            );
            abi::call_ground_entity(original, this, handle);
        }
    }
}
