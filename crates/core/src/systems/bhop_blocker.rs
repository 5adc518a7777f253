//! Jump/ground correlation
//!
//! Blocks a jump pressed within a short window after landing, and resends
//! it once the window has passed if the player is still holding it. This
//! removes the speed gain of perfectly timed consecutive jumps without
//! swallowing legitimate input.

use std::sync::Arc;

use ncz_engine::{GameTick, Host};
use ncz_sdk::HostBuild;
use parking_lot::Mutex;

use super::{System, SystemError};
use crate::convars::LiveFlag;
use crate::hooks::{
    Buttons, GroundStateDispatcher, GroundStateEvent, HookSet, ListenerKey, Observer,
    RunCommandDispatcher, RunCommandEvent,
};
use crate::players::{EntityIndex, PlayerDataStore, PlayerDirectory, ProcessFilter, SlotStatus};

/// Jump window in ticks for the current tick interval
///
/// `None` when the interval is outside `(0, 1)` seconds, which only happens
/// while the server is not simulating.
pub fn blocking_window_ticks(window_seconds: f32, tick_interval: f32) -> Option<i32> {
    if tick_interval > 0.0 && tick_interval < 1.0 {
        Some((window_seconds / tick_interval).floor() as i32)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JumpState {
    #[default]
    Unblocked,
    /// A jump was swallowed and waits for resend
    Blocked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JumpInfo {
    pub on_ground_tick: GameTick,
    pub state: JumpState,
}

impl JumpInfo {
    /// Apply one user command, possibly editing its buttons
    pub fn on_command(&mut self, buttons: &mut Buttons, previous: Buttons, now: GameTick, window: i32) {
        let since_ground = now.ticks_since(self.on_ground_tick);

        if (*buttons ^ previous).contains(Buttons::JUMP) {
            if buttons.contains(Buttons::JUMP) {
                if since_ground < window {
                    buttons.remove(Buttons::JUMP);
                    self.state = JumpState::Blocked;
                } else {
                    self.state = JumpState::Unblocked;
                }
            } else {
                // Released: nothing to resend
                self.state = JumpState::Unblocked;
            }
        } else if self.state == JumpState::Blocked && since_ground >= window {
            buttons.insert(Buttons::JUMP);
            self.state = JumpState::Unblocked;
        }
    }
}

#[derive(Default)]
struct Registrations {
    run_command: Option<ListenerKey>,
    ground: Option<ListenerKey>,
}

pub struct BhopBlocker {
    host: Arc<dyn Host>,
    players: Arc<dyn PlayerDirectory>,
    window_seconds: f32,
    enable_bunnyhopping: LiveFlag,
    auto_bunnyhopping: LiveFlag,
    data: Mutex<PlayerDataStore<JumpInfo>>,
    registrations: Mutex<Registrations>,
}

impl BhopBlocker {
    pub const NAME: &'static str = "BhopBlocker";

    pub fn new(host: Arc<dyn Host>, players: Arc<dyn PlayerDirectory>, window_seconds: f32) -> Self {
        let enable_bunnyhopping = LiveFlag::find(&host, "sv_enablebunnyhopping", Self::NAME);
        let auto_bunnyhopping = match host.identity().build {
            HostBuild::CounterStrikeGlobalOffensive => {
                LiveFlag::find(&host, "sv_autobunnyhopping", Self::NAME)
            }
            HostBuild::Generic => LiveFlag::absent("sv_autobunnyhopping"),
        };

        Self {
            host,
            players,
            window_seconds,
            enable_bunnyhopping,
            auto_bunnyhopping,
            data: Mutex::new(PlayerDataStore::new()),
            registrations: Mutex::new(Registrations::default()),
        }
    }

    /// The server itself allows bunny hopping; checked live
    pub fn bunnyhop_allowed(&self) -> bool {
        self.enable_bunnyhopping.get() || self.auto_bunnyhopping.get()
    }

    pub fn jump_info(&self, index: EntityIndex) -> JumpInfo {
        *self.data.lock().get(index)
    }
}

impl Observer<RunCommandEvent> for BhopBlocker {
    fn on_event(&self, event: &mut RunCommandEvent) {
        if self.bunnyhop_allowed() {
            return;
        }
        let Some(window) = blocking_window_ticks(self.window_seconds, self.host.tick_interval())
        else {
            return;
        };
        let now = self.host.tick_count();

        let mut data = self.data.lock();
        let info = data.get_mut(event.player.index);
        let before = event.buttons;
        info.on_command(&mut event.buttons, event.previous_buttons, now, window);

        if before.contains(Buttons::JUMP) && !event.buttons.contains(Buttons::JUMP) {
            tracing::debug!(
                "{}: blocked jump of player {} at tick {} ({} ticks after landing)",
                Self::NAME,
                event.player.index,
                now,
                now.ticks_since(info.on_ground_tick)
            );
        }
    }
}

impl Observer<GroundStateEvent> for BhopBlocker {
    fn on_event(&self, event: &mut GroundStateEvent) {
        if event.on_ground {
            self.data.lock().get_mut(event.player.index).on_ground_tick = self.host.tick_count();
        }
    }
}

impl System for BhopBlocker {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn load(self: Arc<Self>, hooks: &HookSet) -> Result<(), SystemError> {
        let run_command = hooks.run_command.as_ref().ok_or(SystemError::MissingHook {
            system: Self::NAME,
            hook: RunCommandDispatcher::NAME,
        })?;
        let ground = hooks.ground.as_ref().ok_or(SystemError::MissingHook {
            system: Self::NAME,
            hook: GroundStateDispatcher::NAME,
        })?;

        self.data.lock().reset_all();

        let as_command: Arc<dyn Observer<RunCommandEvent>> = self.clone();
        let as_ground: Arc<dyn Observer<GroundStateEvent>> = self.clone();

        let mut registrations = self.registrations.lock();
        registrations.run_command = Some(
            run_command
                .listeners()
                .add_with(&as_command, SlotStatus::PlayerInTests)?,
        );
        registrations.ground = Some(ground.listeners().add(&as_ground)?);
        Ok(())
    }

    fn unload(&self, hooks: &HookSet) {
        let mut registrations = self.registrations.lock();
        if let (Some(key), Some(dispatcher)) = (registrations.run_command.take(), &hooks.run_command) {
            dispatcher.listeners().remove(key);
        }
        if let (Some(key), Some(dispatcher)) = (registrations.ground.take(), &hooks.ground) {
            dispatcher.listeners().remove(key);
        }
    }

    fn got_job(&self) -> bool {
        !self.bunnyhop_allowed() && self.players.any(ProcessFilter::HumanAtLeastConnecting)
    }

    fn reset_player(&self, index: EntityIndex) {
        self.data.lock().reset(index);
    }
}
