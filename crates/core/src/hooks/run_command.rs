//! PlayerRunCommand hook
//!
//! Listeners may rewrite the command's buttons. The dispatcher writes the
//! final buttons back into the engine's command before the original runs,
//! and remembers the buttons the client actually sent so the next event can
//! report edges against real input.

use std::ffi::c_void;
use std::sync::{Arc, LazyLock};

use ncz_engine::{EdictRef, Host};
use ncz_sdk::IMoveHelper;
use parking_lot::Mutex;

use super::abi;
use super::cell::DispatcherCell;
use super::events::RunCommandEvent;
use super::registry::{ListenerRegistry, Observer};
use super::usercmd::{Buttons, CommandLayout};
use super::vtable::{PatchError, VTablePatchEngine};
use crate::gamedata::{slots, GamedataError, SlotTable, TargetIdentity};
use crate::players::{EntityIndex, PlayerDataStore, PlayerDirectory, SlotStatus};

pub(crate) static RUN_COMMAND_HOOKS: LazyLock<DispatcherCell<RunCommandDispatcher>> =
    LazyLock::new(DispatcherCell::new);

/// Listeners with the minimum player status they want events for
pub type RunCommandRegistry = ListenerRegistry<dyn Observer<RunCommandEvent>, SlotStatus>;

#[derive(Debug, Clone, Copy, Default)]
struct LastCommand {
    buttons: i32,
}

pub struct RunCommandDispatcher {
    host: Arc<dyn Host>,
    players: Arc<dyn PlayerDirectory>,
    slot: usize,
    layout: CommandLayout,
    patches: Mutex<VTablePatchEngine>,
    listeners: RunCommandRegistry,
    previous: Mutex<PlayerDataStore<LastCommand>>,
}

impl RunCommandDispatcher {
    pub const NAME: &'static str = "PlayerRunCommandHookListener";

    pub fn new(
        host: Arc<dyn Host>,
        players: Arc<dyn PlayerDirectory>,
        slots: &SlotTable,
    ) -> Result<Self, GamedataError> {
        let target = TargetIdentity::current(host.identity());
        let slot = slots.resolve(slots::PLAYER_RUN_COMMAND, &target)?;
        let layout = CommandLayout::for_build(host.identity().build);

        Ok(Self {
            host,
            players,
            slot,
            layout,
            patches: Mutex::new(VTablePatchEngine::new(Self::NAME)),
            listeners: ListenerRegistry::new("PlayerRunCommand"),
            previous: Mutex::new(PlayerDataStore::new()),
        })
    }

    pub fn listeners(&self) -> &RunCommandRegistry {
        &self.listeners
    }

    pub fn layout(&self) -> CommandLayout {
        self.layout
    }

    pub fn hook_player(&self, edict: EdictRef) -> Result<usize, PatchError> {
        let entity = super::expect_entity(&*self.host, edict, Self::NAME);
        super::install_all(
            &self.patches,
            entity,
            &[("PlayerRunCommand", self.slot, abi::run_command_trampoline as *const ())],
        )
    }

    pub fn unhook_all(&self) -> usize {
        self.patches.lock().uninstall_all()
    }

    pub fn patch_count(&self) -> usize {
        self.patches.lock().len()
    }

    /// Forget the stored previous command of a slot
    pub fn reset_player(&self, index: EntityIndex) {
        self.previous.lock().reset(index);
    }

    /// `PlayerRunCommand` on `this`
    ///
    /// # Safety
    /// `this` must be the hooked object; `cmd` null or a live command of
    /// this dispatcher's layout.
    pub unsafe fn run_command(
        &self,
        this: *mut c_void,
        cmd: *mut c_void,
        move_helper: *mut IMoveHelper,
    ) {
        if !cmd.is_null() {
            if let Some(player) = self.players.lookup_entity(this) {
                let sent = self.layout.read(cmd);
                let previous = self.previous.lock().get(player.index).buttons;

                let mut event = RunCommandEvent {
                    player,
                    command_number: sent.command_number,
                    tick_count: sent.tick_count,
                    buttons: sent.buttons,
                    previous_buttons: Buttons::from_bits_retain(previous),
                };
                self.listeners.for_each(|listener, min_status| {
                    if player.status >= *min_status {
                        listener.on_event(&mut event);
                    }
                });

                if event.buttons != sent.buttons {
                    tracing::trace!(
                        "Player {} command {}: buttons {:?} -> {:?}",
                        player.index,
                        sent.command_number,
                        sent.buttons,
                        event.buttons
                    );
                    self.layout.write_buttons(cmd, event.buttons);
                }

                self.previous.lock().get_mut(player.index).buttons = sent.buttons.bits();
            }
        }

        let original = super::original_for(
            &self.patches,
            this,
            self.slot,
            abi::run_command_trampoline as *const (),
            "PlayerRunCommand",
        );
        abi::call_run_command(original, this, cmd, move_helper);
    }
}

pub(crate) unsafe fn run_command_hook(
    this: *mut c_void,
    cmd: *mut c_void,
    move_helper: *mut IMoveHelper,
) {
    match RUN_COMMAND_HOOKS.get() {
        Some(dispatcher) => dispatcher.run_command(this, cmd, move_helper),
        None => {
            let original = super::saved_original_for(
                this,
                abi::run_command_trampoline as *const (),
                "PlayerRunCommand",
            );
            abi::call_run_command(original, this, cmd, move_helper);
        }
    }
}

#[cfg(all(test, not(all(windows, target_arch = "x86"))))]
mod tests {
    use super::*;
    use crate::testing::{Fixture, TRAMPOLINE_LOCK};
    use ncz_sdk::usercmd::buttons::{IN_ATTACK, IN_DUCK, IN_JUMP};
    use ncz_sdk::CUserCmd;
    use std::sync::atomic::Ordering;

    /// Records what it saw and optionally strips buttons
    struct Stripper {
        strip: Buttons,
        seen: Mutex<Vec<(Buttons, Buttons)>>,
    }

    impl Stripper {
        fn new(strip: Buttons) -> Arc<Self> {
            Arc::new(Self {
                strip,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Observer<RunCommandEvent> for Stripper {
        fn on_event(&self, event: &mut RunCommandEvent) {
            self.seen
                .lock()
                .push((event.buttons, event.previous_buttons));
            event.buttons.remove(self.strip);
        }
    }

    fn dispatcher(fixture: &Fixture) -> RunCommandDispatcher {
        let players: Arc<dyn PlayerDirectory> = fixture.players.clone();
        RunCommandDispatcher::new(fixture.host.clone(), players, &fixture.slots).unwrap()
    }

    fn command(buttons: i32) -> CUserCmd {
        CUserCmd {
            command_number: 1,
            tick_count: 100,
            buttons,
            ..Default::default()
        }
    }

    fn run(dispatcher: &RunCommandDispatcher, this: *mut c_void, cmd: &mut CUserCmd) {
        unsafe {
            dispatcher.run_command(
                this,
                cmd as *mut CUserCmd as *mut c_void,
                std::ptr::null_mut(),
            )
        }
    }

    #[test]
    fn test_listener_changes_written_back() {
        let fixture = Fixture::new();
        let dispatcher = dispatcher(&fixture);
        let (player, edict) = fixture.add_player(1, SlotStatus::PlayerInTests);
        let stripper = Stripper::new(Buttons::JUMP);
        let listener: Arc<dyn Observer<RunCommandEvent>> = stripper.clone();
        dispatcher
            .listeners()
            .add_with(&listener, SlotStatus::PlayerInTests)
            .unwrap();
        dispatcher.hook_player(edict).unwrap();

        let mut cmd = command(IN_JUMP | IN_DUCK);
        run(&dispatcher, player.as_ptr(), &mut cmd);

        assert_eq!(cmd.buttons, IN_DUCK);
        assert_eq!(player.last_run_buttons.load(Ordering::SeqCst), IN_DUCK);
        assert_eq!(player.run_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_previous_is_client_input() {
        let fixture = Fixture::new();
        let dispatcher = dispatcher(&fixture);
        let (player, edict) = fixture.add_player(1, SlotStatus::PlayerInTests);
        let stripper = Stripper::new(Buttons::JUMP);
        let listener: Arc<dyn Observer<RunCommandEvent>> = stripper.clone();
        dispatcher
            .listeners()
            .add_with(&listener, SlotStatus::PlayerInTests)
            .unwrap();
        dispatcher.hook_player(edict).unwrap();

        run(&dispatcher, player.as_ptr(), &mut command(IN_JUMP));
        run(&dispatcher, player.as_ptr(), &mut command(IN_JUMP | IN_ATTACK));

        let seen = stripper.seen.lock();
        assert_eq!(seen[0], (Buttons::JUMP, Buttons::empty()));
        // Previous reports the JUMP the client sent, not the stripped value
        assert_eq!(seen[1], (Buttons::JUMP | Buttons::ATTACK, Buttons::JUMP));
    }

    #[test]
    fn test_reset_player_clears_previous() {
        let fixture = Fixture::new();
        let dispatcher = dispatcher(&fixture);
        let (player, edict) = fixture.add_player(1, SlotStatus::PlayerInTests);
        let stripper = Stripper::new(Buttons::empty());
        let listener: Arc<dyn Observer<RunCommandEvent>> = stripper.clone();
        dispatcher
            .listeners()
            .add_with(&listener, SlotStatus::Invalid)
            .unwrap();
        dispatcher.hook_player(edict).unwrap();

        run(&dispatcher, player.as_ptr(), &mut command(IN_DUCK));
        dispatcher.reset_player(EntityIndex::new(1).unwrap());
        run(&dispatcher, player.as_ptr(), &mut command(IN_DUCK));

        let seen = stripper.seen.lock();
        assert_eq!(seen[1].1, Buttons::empty());
    }

    #[test]
    fn test_min_status_filter() {
        let fixture = Fixture::new();
        let dispatcher = dispatcher(&fixture);
        let (player, edict) = fixture.add_player(1, SlotStatus::PlayerConnected);
        let tests_only = Stripper::new(Buttons::JUMP);
        let everyone = Stripper::new(Buttons::empty());
        let tests_only_listener: Arc<dyn Observer<RunCommandEvent>> = tests_only.clone();
        let everyone_listener: Arc<dyn Observer<RunCommandEvent>> = everyone.clone();
        dispatcher
            .listeners()
            .add_with(&tests_only_listener, SlotStatus::PlayerInTests)
            .unwrap();
        dispatcher
            .listeners()
            .add_with(&everyone_listener, SlotStatus::Bot)
            .unwrap();
        dispatcher.hook_player(edict).unwrap();

        let mut cmd = command(IN_JUMP);
        run(&dispatcher, player.as_ptr(), &mut cmd);

        assert!(tests_only.seen.lock().is_empty());
        assert_eq!(everyone.seen.lock().len(), 1);
        assert_eq!(cmd.buttons, IN_JUMP);
    }

    #[test]
    fn test_null_command_forwards() {
        let fixture = Fixture::new();
        let dispatcher = dispatcher(&fixture);
        let (player, edict) = fixture.add_player(1, SlotStatus::PlayerInTests);
        let stripper = Stripper::new(Buttons::JUMP);
        let listener: Arc<dyn Observer<RunCommandEvent>> = stripper.clone();
        dispatcher
            .listeners()
            .add_with(&listener, SlotStatus::Invalid)
            .unwrap();
        dispatcher.hook_player(edict).unwrap();

        unsafe {
            dispatcher.run_command(player.as_ptr(), std::ptr::null_mut(), std::ptr::null_mut())
        };

        assert!(stripper.seen.lock().is_empty());
        assert_eq!(player.run_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_through_vtable() {
        let _lock = TRAMPOLINE_LOCK.lock();
        let fixture = Fixture::new();
        let dispatcher = Arc::new(dispatcher(&fixture));
        let (player, edict) = fixture.add_player(6, SlotStatus::PlayerInTests);
        let stripper = Stripper::new(Buttons::JUMP);
        let listener: Arc<dyn Observer<RunCommandEvent>> = stripper.clone();
        dispatcher
            .listeners()
            .add_with(&listener, SlotStatus::PlayerInTests)
            .unwrap();

        RUN_COMMAND_HOOKS.attach(dispatcher.clone());
        dispatcher.hook_player(edict).unwrap();

        let mut cmd = command(IN_JUMP | IN_ATTACK);
        player.call_run_command(&mut cmd);
        assert_eq!(player.last_run_buttons.load(Ordering::SeqCst), IN_ATTACK);

        dispatcher.unhook_all();
        RUN_COMMAND_HOOKS.detach(&dispatcher);
    }
}
