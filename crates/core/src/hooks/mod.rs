//! Hook system
//!
//! Hooks replace vtable entries of the player class with trampolines
//! ([`abi`]). Each trampoline looks up its dispatcher in a
//! [`DispatcherCell`], turns the raw call into a typed event, fans it out to
//! the dispatcher's [`ListenerRegistry`], and finally calls the original
//! game function. The original is called even when no dispatcher is
//! attached, through the originals [`vtable`] keeps for every live patch.
//!
//! Dispatchers:
//! - [`WeaponHookDispatcher`] - `Weapon_Equip` / `Weapon_Drop`
//! - [`RunCommandDispatcher`] - `PlayerRunCommand`, with button write-back
//! - [`GroundStateDispatcher`] - ground entity changes

pub(crate) mod abi;
pub mod cell;
pub mod events;
pub mod gameframe;
pub mod ground;
pub mod registry;
pub mod run_command;
pub mod usercmd;
pub mod vtable;
pub mod weapon;

use std::ffi::c_void;
use std::sync::Arc;

use ncz_engine::{EdictRef, EntityPtr, Host};
use parking_lot::Mutex;

use crate::gamedata::{GamedataError, SlotTable};
use crate::players::{EntityIndex, PlayerDirectory};

pub use cell::DispatcherCell;
pub use events::{GroundStateEvent, RunCommandEvent, WeaponDropEvent, WeaponEquipEvent};
pub use gameframe::FrameStats;
pub use ground::GroundStateDispatcher;
pub use registry::{ListenerError, ListenerKey, ListenerRegistry, Observer};
pub use run_command::RunCommandDispatcher;
pub use usercmd::{Buttons, CommandLayout};
pub use vtable::{PatchError, PatchKey, PatchRecord, VTablePatchEngine};
pub use weapon::WeaponHookDispatcher;

/// The dispatchers that could be built for the running game
///
/// A dispatcher whose slot could not be resolved is absent; systems that
/// need it refuse to load.
#[derive(Clone, Default)]
pub struct HookSet {
    pub weapon: Option<Arc<WeaponHookDispatcher>>,
    pub run_command: Option<Arc<RunCommandDispatcher>>,
    pub ground: Option<Arc<GroundStateDispatcher>>,
}

impl HookSet {
    /// Build every dispatcher from the loaded slot table
    pub fn build(
        host: &Arc<dyn Host>,
        players: &Arc<dyn PlayerDirectory>,
        slots: Option<&SlotTable>,
    ) -> Self {
        let Some(slots) = slots else {
            tracing::warn!("No gamedata loaded, hooks stay inert");
            return Self::default();
        };

        Self {
            weapon: build_one(
                WeaponHookDispatcher::NAME,
                WeaponHookDispatcher::new(host.clone(), players.clone(), slots),
            ),
            run_command: build_one(
                RunCommandDispatcher::NAME,
                RunCommandDispatcher::new(host.clone(), players.clone(), slots),
            ),
            ground: build_one(
                GroundStateDispatcher::NAME,
                GroundStateDispatcher::new(host.clone(), players.clone(), slots),
            ),
        }
    }

    /// Make the dispatchers reachable from their trampolines
    pub fn attach(&self) {
        if let Some(weapon) = &self.weapon {
            weapon::WEAPON_HOOKS.attach(weapon.clone());
        }
        if let Some(run_command) = &self.run_command {
            run_command::RUN_COMMAND_HOOKS.attach(run_command.clone());
        }
        if let Some(ground) = &self.ground {
            ground::GROUND_HOOKS.attach(ground.clone());
        }
    }

    /// Clear the dispatcher cells of dispatchers with no patches left
    ///
    /// A dispatcher whose slots could not all be restored stays attached so
    /// its trampolines keep delivering events. Returns how many stayed.
    pub fn detach(&self) -> usize {
        let mut kept = 0;
        if let Some(weapon) = &self.weapon {
            kept += detach_one(&weapon::WEAPON_HOOKS, weapon, weapon.patch_count());
        }
        if let Some(run_command) = &self.run_command {
            kept += detach_one(
                &run_command::RUN_COMMAND_HOOKS,
                run_command,
                run_command.patch_count(),
            );
        }
        if let Some(ground) = &self.ground {
            kept += detach_one(&ground::GROUND_HOOKS, ground, ground.patch_count());
        }
        kept
    }

    /// Patch a player entity's class for every dispatcher
    ///
    /// Every dispatcher is tried; the first error is returned.
    pub fn hook_player(&self, edict: EdictRef) -> Result<usize, PatchError> {
        let results = [
            self.weapon.as_ref().map(|d| d.hook_player(edict)),
            self.run_command.as_ref().map(|d| d.hook_player(edict)),
            self.ground.as_ref().map(|d| d.hook_player(edict)),
        ];

        let mut installed = 0;
        let mut first_error = None;
        for result in results.into_iter().flatten() {
            match result {
                Ok(count) => installed += count,
                Err(e) => {
                    tracing::error!("Failed to hook player: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(installed),
        }
    }

    /// Forget per-player dispatcher state
    pub fn reset_player(&self, index: EntityIndex) {
        if let Some(run_command) = &self.run_command {
            run_command.reset_player(index);
        }
    }

    /// Restore every patched slot
    pub fn uninstall_all(&self) -> usize {
        self.weapon.as_ref().map_or(0, |d| d.unhook_all())
            + self.run_command.as_ref().map_or(0, |d| d.unhook_all())
            + self.ground.as_ref().map_or(0, |d| d.unhook_all())
    }
}

fn detach_one<D>(cell: &DispatcherCell<D>, dispatcher: &Arc<D>, live_patches: usize) -> usize {
    if live_patches > 0 {
        tracing::warn!("{} patches still installed, keeping dispatcher attached", live_patches);
        return 1;
    }
    cell.detach(dispatcher);
    0
}

fn build_one<D>(name: &str, result: Result<D, GamedataError>) -> Option<Arc<D>> {
    match result {
        Ok(dispatcher) => Some(Arc::new(dispatcher)),
        Err(e) => {
            tracing::error!("{}: unable to resolve slot: {}", name, e);
            None
        }
    }
}

/// Edict of an entity the game handed us; must be valid
pub(crate) fn expect_valid_edict(
    host: &dyn Host,
    edict: Option<EdictRef>,
    context: &str,
) -> EdictRef {
    match edict {
        Some(edict) if host.is_valid_edict(edict) => edict,
        _ => crate::contract_violation!("{}: invalid edict {:?}", context, edict),
    }
}

/// Game entity behind a player edict; must exist
pub(crate) fn expect_entity(host: &dyn Host, edict: EdictRef, context: &str) -> EntityPtr {
    let edict = expect_valid_edict(host, Some(edict), context);
    match host.edict_to_entity(edict) {
        Some(entity) => entity,
        None => crate::contract_violation!("{}: edict {:?} has no entity", context, edict),
    }
}

/// Install `(name, slot, trampoline)` patches on `entity`'s class
///
/// Slots already patched are skipped. Returns the number of new patches.
pub(crate) fn install_all(
    patches: &Mutex<VTablePatchEngine>,
    entity: EntityPtr,
    hooks: &[(&'static str, usize, *const ())],
) -> Result<usize, PatchError> {
    let mut patches = patches.lock();
    let mut installed = 0;

    for &(name, slot, trampoline) in hooks {
        // SAFETY: entity is a live server entity and the slot index comes
        // from gamedata matching this game and platform.
        match unsafe { patches.install(name, entity.as_ptr(), slot, trampoline) } {
            Ok(_) => installed += 1,
            Err(PatchError::AlreadyPatched { .. }) => {
                tracing::trace!("{} already hooked for this class", name);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(installed)
}

/// Function a hooked call on `this` must be forwarded to
///
/// # Safety
/// `this` must be the object the game called through.
pub(crate) unsafe fn original_for(
    patches: &Mutex<VTablePatchEngine>,
    this: *mut c_void,
    slot: usize,
    trampoline: *const (),
    context: &str,
) -> *const () {
    let original = patches.lock().original(this, slot);
    match original {
        Some(original) => original,
        None => saved_original_for(this, trampoline, context),
    }
}

/// Original behind `trampoline`, for calls that reach no dispatcher
///
/// # Safety
/// `this` must be the object the game called through.
pub(crate) unsafe fn saved_original_for(
    this: *mut c_void,
    trampoline: *const (),
    context: &str,
) -> *const () {
    match vtable::saved_original(this, trampoline) {
        Some(original) => original,
        None => crate::contract_violation!("{}: no original for {:#x}", context, this as usize),
    }
}

#[cfg(all(test, not(all(windows, target_arch = "x86"))))]
mod tests {
    use super::*;
    use crate::players::SlotStatus;
    use crate::testing::{Fixture, TRAMPOLINE_LOCK};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_detach_keeps_patched_dispatchers() {
        let _lock = TRAMPOLINE_LOCK.lock();
        let fixture = Fixture::new();
        let players: Arc<dyn PlayerDirectory> = fixture.players.clone();
        let hooks = HookSet::build(&fixture.host, &players, Some(&fixture.slots));
        let (player, edict) = fixture.add_player(2, SlotStatus::PlayerInTests);
        let (weapon, _) = fixture.weapon();

        hooks.attach();
        assert_eq!(hooks.hook_player(edict).unwrap(), 4);

        assert_eq!(hooks.detach(), 3);
        let attached = weapon::WEAPON_HOOKS.get().unwrap();
        assert!(Arc::ptr_eq(&attached, hooks.weapon.as_ref().unwrap()));

        player.call_weapon_equip(weapon);
        assert_eq!(player.equip_calls.load(Ordering::SeqCst), 1);

        assert_eq!(hooks.uninstall_all(), 4);
        assert_eq!(hooks.detach(), 0);
        assert!(weapon::WEAPON_HOOKS.get().is_none());
        assert!(run_command::RUN_COMMAND_HOOKS.get().is_none());
        assert!(ground::GROUND_HOOKS.get().is_none());
    }
}
