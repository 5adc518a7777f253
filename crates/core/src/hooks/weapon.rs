//! Weapon equip/drop hooks

use std::ffi::c_void;
use std::sync::{Arc, LazyLock};

use ncz_engine::{EdictRef, Host};
use ncz_sdk::Vector;
use parking_lot::Mutex;

use super::abi;
use super::cell::DispatcherCell;
use super::events::{WeaponDropEvent, WeaponEquipEvent};
use super::registry::{ListenerRegistry, Observer};
use super::vtable::{PatchError, VTablePatchEngine};
use crate::gamedata::{slots, GamedataError, SlotTable, TargetIdentity};
use crate::players::PlayerDirectory;

pub(crate) static WEAPON_HOOKS: LazyLock<DispatcherCell<WeaponHookDispatcher>> =
    LazyLock::new(DispatcherCell::new);

pub type EquipRegistry = ListenerRegistry<dyn Observer<WeaponEquipEvent>>;
pub type DropRegistry = ListenerRegistry<dyn Observer<WeaponDropEvent>>;

/// Fans `Weapon_Equip` and `Weapon_Drop` out to listeners
pub struct WeaponHookDispatcher {
    host: Arc<dyn Host>,
    players: Arc<dyn PlayerDirectory>,
    equip_slot: usize,
    drop_slot: usize,
    patches: Mutex<VTablePatchEngine>,
    equip_listeners: EquipRegistry,
    drop_listeners: DropRegistry,
}

impl WeaponHookDispatcher {
    pub const NAME: &'static str = "WeaponHookListener";

    pub fn new(
        host: Arc<dyn Host>,
        players: Arc<dyn PlayerDirectory>,
        slots: &SlotTable,
    ) -> Result<Self, GamedataError> {
        let target = TargetIdentity::current(host.identity());
        let equip_slot = slots.resolve(slots::WEAPON_EQUIP, &target)?;
        let drop_slot = slots.resolve(slots::WEAPON_DROP, &target)?;

        Ok(Self {
            host,
            players,
            equip_slot,
            drop_slot,
            patches: Mutex::new(VTablePatchEngine::new(Self::NAME)),
            equip_listeners: ListenerRegistry::new("WeaponEquip"),
            drop_listeners: ListenerRegistry::new("WeaponDrop"),
        })
    }

    pub fn equip_listeners(&self) -> &EquipRegistry {
        &self.equip_listeners
    }

    pub fn drop_listeners(&self) -> &DropRegistry {
        &self.drop_listeners
    }

    /// Patch the class of the player behind `edict`
    pub fn hook_player(&self, edict: EdictRef) -> Result<usize, PatchError> {
        let entity = super::expect_entity(&*self.host, edict, Self::NAME);
        super::install_all(
            &self.patches,
            entity,
            &[
                ("Weapon_Equip", self.equip_slot, abi::weapon_equip_trampoline as *const ()),
                ("Weapon_Drop", self.drop_slot, abi::weapon_drop_trampoline as *const ()),
            ],
        )
    }

    pub fn unhook_all(&self) -> usize {
        self.patches.lock().uninstall_all()
    }

    /// Patches currently installed
    pub fn patch_count(&self) -> usize {
        self.patches.lock().len()
    }

    /// `Weapon_Equip` on `this`
    ///
    /// # Safety
    /// `this` must be the hooked object the game called through.
    pub unsafe fn weapon_equip(&self, this: *mut c_void, weapon: *mut c_void) {
        if let Some(player) = self.players.lookup_entity(this) {
            let edict = self.host.entity_to_edict(weapon);
            let weapon_edict = super::expect_valid_edict(&*self.host, edict, "Weapon_Equip");

            let mut event = WeaponEquipEvent {
                player,
                weapon: weapon_edict,
            };
            self.equip_listeners
                .for_each(|listener, _| listener.on_event(&mut event));
        }

        let original = super::original_for(
            &self.patches,
            this,
            self.equip_slot,
            abi::weapon_equip_trampoline as *const (),
            "Weapon_Equip",
        );
        abi::call_weapon_equip(original, this, weapon);
    }

    /// `Weapon_Drop` on `this`
    ///
    /// # Safety
    /// `this` must be the hooked object; `target` and `velocity` null or valid.
    pub unsafe fn weapon_drop(
        &self,
        this: *mut c_void,
        weapon: *mut c_void,
        target: *const Vector,
        velocity: *const Vector,
    ) {
        // The game drops "nothing" when a player dies unarmed
        if !weapon.is_null() {
            if let Some(player) = self.players.lookup_entity(this) {
                let edict = self.host.entity_to_edict(weapon);
                let weapon_edict = super::expect_valid_edict(&*self.host, edict, "Weapon_Drop");

                let mut event = WeaponDropEvent {
                    player,
                    weapon: weapon_edict,
                    target: target.as_ref().copied(),
                    velocity: velocity.as_ref().copied(),
                };
                self.drop_listeners
                    .for_each(|listener, _| listener.on_event(&mut event));
            }
        }

        let original = super::original_for(
            &self.patches,
            this,
            self.drop_slot,
            abi::weapon_drop_trampoline as *const (),
            "Weapon_Drop",
        );
        abi::call_weapon_drop(original, this, weapon, target, velocity);
    }
}

pub(crate) unsafe fn weapon_equip_hook(this: *mut c_void, weapon: *mut c_void) {
    match WEAPON_HOOKS.get() {
        Some(dispatcher) => dispatcher.weapon_equip(this, weapon),
        None => {
            let original = super::saved_original_for(
                this,
                abi::weapon_equip_trampoline as *const (),
                "Weapon_Equip",
            );
            abi::call_weapon_equip(original, this, weapon);
        }
    }
}

pub(crate) unsafe fn weapon_drop_hook(
    this: *mut c_void,
    weapon: *mut c_void,
    target: *const Vector,
    velocity: *const Vector,
) {
    match WEAPON_HOOKS.get() {
        Some(dispatcher) => dispatcher.weapon_drop(this, weapon, target, velocity),
        None => {
            let original = super::saved_original_for(
                this,
                abi::weapon_drop_trampoline as *const (),
                "Weapon_Drop",
            );
            abi::call_weapon_drop(original, this, weapon, target, velocity);
        }
    }
}

#[cfg(all(test, not(all(windows, target_arch = "x86"))))]
mod tests {
    use super::*;
    use crate::players::{PlayerRef, SlotStatus};
    use crate::testing::{Fixture, FakePlayer, TRAMPOLINE_LOCK, WEAPON_DROP_SLOT, WEAPON_EQUIP_SLOT};
    use std::sync::atomic::Ordering;

    #[derive(Default)]
    struct Recorder {
        equips: Mutex<Vec<(PlayerRef, EdictRef)>>,
        drops: Mutex<Vec<WeaponDropEvent>>,
        /// Original call count observed while the listener ran
        seen_original_calls: Mutex<Vec<u32>>,
        player: Mutex<Option<usize>>,
    }

    impl Recorder {
        fn watching(player: &FakePlayer) -> Arc<Self> {
            let recorder = Self::default();
            *recorder.player.lock() = Some(player.as_ptr() as usize);
            Arc::new(recorder)
        }

        fn original_calls(&self) -> u32 {
            let player = *self.player.lock();
            player.map_or(0, |p| unsafe {
                (*(p as *const FakePlayer)).equip_calls.load(Ordering::SeqCst)
            })
        }
    }

    impl Observer<WeaponEquipEvent> for Recorder {
        fn on_event(&self, event: &mut WeaponEquipEvent) {
            self.seen_original_calls.lock().push(self.original_calls());
            self.equips.lock().push((event.player, event.weapon));
        }
    }

    impl Observer<WeaponDropEvent> for Recorder {
        fn on_event(&self, event: &mut WeaponDropEvent) {
            self.drops.lock().push(event.clone());
        }
    }

    fn dispatcher(fixture: &Fixture) -> WeaponHookDispatcher {
        let players: Arc<dyn PlayerDirectory> = fixture.players.clone();
        WeaponHookDispatcher::new(fixture.host.clone(), players, &fixture.slots).unwrap()
    }

    fn register(dispatcher: &WeaponHookDispatcher, recorder: &Arc<Recorder>) {
        let equip: Arc<dyn Observer<WeaponEquipEvent>> = recorder.clone();
        let drop: Arc<dyn Observer<WeaponDropEvent>> = recorder.clone();
        dispatcher.equip_listeners().add(&equip).unwrap();
        dispatcher.drop_listeners().add(&drop).unwrap();
    }

    #[test]
    fn test_equip_fans_out_before_original() {
        let fixture = Fixture::new();
        let dispatcher = dispatcher(&fixture);
        let (player, edict) = fixture.add_player(3, SlotStatus::PlayerInTests);
        let (weapon, weapon_edict) = fixture.weapon();
        let recorder = Recorder::watching(&player);
        register(&dispatcher, &recorder);

        assert_eq!(dispatcher.hook_player(edict).unwrap(), 2);
        unsafe { dispatcher.weapon_equip(player.as_ptr(), weapon) };

        let equips = recorder.equips.lock();
        assert_eq!(equips.len(), 1);
        assert_eq!(equips[0].0.index.get(), 3);
        assert_eq!(equips[0].1, weapon_edict);
        assert_eq!(*recorder.seen_original_calls.lock(), vec![0]);
        assert_eq!(player.equip_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_entity_forwards_only() {
        let fixture = Fixture::new();
        let dispatcher = dispatcher(&fixture);
        let (player, edict) = fixture.add_player(1, SlotStatus::PlayerInTests);
        let stranger = FakePlayer::sharing(&player);
        let (weapon, _) = fixture.weapon();
        let recorder = Recorder::watching(&player);
        register(&dispatcher, &recorder);

        dispatcher.hook_player(edict).unwrap();
        unsafe { dispatcher.weapon_equip(stranger.as_ptr(), weapon) };

        assert!(recorder.equips.lock().is_empty());
        assert_eq!(stranger.equip_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_null_weapon_forwards_only() {
        let fixture = Fixture::new();
        let dispatcher = dispatcher(&fixture);
        let (player, edict) = fixture.add_player(1, SlotStatus::PlayerInTests);
        let recorder = Recorder::watching(&player);
        register(&dispatcher, &recorder);

        dispatcher.hook_player(edict).unwrap();
        unsafe {
            dispatcher.weapon_drop(
                player.as_ptr(),
                std::ptr::null_mut(),
                std::ptr::null(),
                std::ptr::null(),
            )
        };

        assert!(recorder.drops.lock().is_empty());
        assert_eq!(player.drop_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_carries_vectors() {
        let fixture = Fixture::new();
        let dispatcher = dispatcher(&fixture);
        let (player, edict) = fixture.add_player(2, SlotStatus::PlayerConnected);
        let (weapon, weapon_edict) = fixture.weapon();
        let recorder = Recorder::watching(&player);
        register(&dispatcher, &recorder);

        let velocity = Vector::new(1.0, 2.0, 3.0);
        dispatcher.hook_player(edict).unwrap();
        unsafe { dispatcher.weapon_drop(player.as_ptr(), weapon, std::ptr::null(), &velocity) };

        let drops = recorder.drops.lock();
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].weapon, weapon_edict);
        assert_eq!(drops[0].target, None);
        assert_eq!(drops[0].velocity, Some(velocity));
        assert_eq!(player.drop_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "invalid edict")]
    fn test_invalid_weapon_edict_is_contract_violation() {
        let fixture = Fixture::new();
        let dispatcher = dispatcher(&fixture);
        let (player, edict) = fixture.add_player(1, SlotStatus::PlayerInTests);
        let (weapon, weapon_edict) = fixture.weapon();
        fixture.fake.invalidate(weapon_edict);

        dispatcher.hook_player(edict).unwrap();
        unsafe { dispatcher.weapon_equip(player.as_ptr(), weapon) };
    }

    #[test]
    fn test_same_class_hooked_once() {
        let fixture = Fixture::new();
        let dispatcher = dispatcher(&fixture);
        let (first, first_edict) = fixture.add_player(1, SlotStatus::PlayerConnected);
        let second = FakePlayer::sharing(&first);
        let second_edict = fixture.place_player(&second, 2, SlotStatus::PlayerConnected);

        assert_eq!(dispatcher.hook_player(first_edict).unwrap(), 2);
        assert_eq!(dispatcher.hook_player(second_edict).unwrap(), 0);

        let original_equip = FakePlayer::new().slot(WEAPON_EQUIP_SLOT);
        assert_ne!(first.slot(WEAPON_EQUIP_SLOT), original_equip);

        assert_eq!(dispatcher.unhook_all(), 2);
        assert_eq!(dispatcher.unhook_all(), 0);
        assert_eq!(first.slot(WEAPON_EQUIP_SLOT), original_equip);
        assert_eq!(
            first.slot(WEAPON_DROP_SLOT),
            FakePlayer::new().slot(WEAPON_DROP_SLOT)
        );
    }

    #[test]
    fn test_through_vtable() {
        let _lock = TRAMPOLINE_LOCK.lock();
        let fixture = Fixture::new();
        let dispatcher = Arc::new(dispatcher(&fixture));
        let (player, edict) = fixture.add_player(4, SlotStatus::PlayerInTests);
        let (weapon, _) = fixture.weapon();
        let recorder = Recorder::watching(&player);
        register(&dispatcher, &recorder);

        WEAPON_HOOKS.attach(dispatcher.clone());
        dispatcher.hook_player(edict).unwrap();

        player.call_weapon_equip(weapon);
        player.call_weapon_drop(weapon);

        assert_eq!(recorder.equips.lock().len(), 1);
        assert_eq!(recorder.drops.lock().len(), 1);
        assert_eq!(player.equip_calls.load(Ordering::SeqCst), 1);
        assert_eq!(player.drop_calls.load(Ordering::SeqCst), 1);

        dispatcher.unhook_all();
        WEAPON_HOOKS.detach(&dispatcher);

        // Unhooked: straight to the original
        player.call_weapon_equip(weapon);
        assert_eq!(recorder.equips.lock().len(), 1);
        assert_eq!(player.equip_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_patched_slot_without_dispatcher_still_forwards() {
        let _lock = TRAMPOLINE_LOCK.lock();
        let fixture = Fixture::new();
        let dispatcher = Arc::new(dispatcher(&fixture));
        let (player, edict) = fixture.add_player(5, SlotStatus::PlayerInTests);
        let (weapon, _) = fixture.weapon();
        let recorder = Recorder::watching(&player);
        register(&dispatcher, &recorder);

        WEAPON_HOOKS.attach(dispatcher.clone());
        dispatcher.hook_player(edict).unwrap();
        WEAPON_HOOKS.detach(&dispatcher);

        player.call_weapon_equip(weapon);
        player.call_weapon_drop(weapon);

        assert!(recorder.equips.lock().is_empty());
        assert!(recorder.drops.lock().is_empty());
        assert_eq!(player.equip_calls.load(Ordering::SeqCst), 1);
        assert_eq!(player.drop_calls.load(Ordering::SeqCst), 1);

        assert_eq!(dispatcher.unhook_all(), 2);
    }

    #[test]
    fn test_dispatcher_forwards_through_foreign_patch() {
        let _lock = TRAMPOLINE_LOCK.lock();
        let fixture = Fixture::new();
        let installer = dispatcher(&fixture);
        let current = Arc::new(dispatcher(&fixture));
        let (player, edict) = fixture.add_player(6, SlotStatus::PlayerInTests);
        let (weapon, _) = fixture.weapon();
        let recorder = Recorder::watching(&player);
        register(&current, &recorder);

        installer.hook_player(edict).unwrap();
        WEAPON_HOOKS.attach(current.clone());

        player.call_weapon_equip(weapon);

        // The attached dispatcher owns no patch, yet it fans out and forwards
        assert_eq!(current.patch_count(), 0);
        assert_eq!(recorder.equips.lock().len(), 1);
        assert_eq!(player.equip_calls.load(Ordering::SeqCst), 1);

        WEAPON_HOOKS.detach(&current);
        assert_eq!(installer.unhook_all(), 2);
    }
}
