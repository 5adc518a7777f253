//! Hook events delivered to listeners
//!
//! Events are plain values built by a dispatcher for one call. A listener
//! only sees the event for the duration of its `on_event` call.

use ncz_engine::EdictRef;
use ncz_sdk::Vector;

use crate::hooks::usercmd::Buttons;
use crate::players::PlayerRef;

/// A player picked up a weapon
#[derive(Debug, Clone)]
pub struct WeaponEquipEvent {
    pub player: PlayerRef,
    pub weapon: EdictRef,
}

/// A player dropped a weapon
#[derive(Debug, Clone)]
pub struct WeaponDropEvent {
    pub player: PlayerRef,
    pub weapon: EdictRef,
    pub target: Option<Vector>,
    pub velocity: Option<Vector>,
}

/// A user command is about to be executed for a player
///
/// Listeners may change `buttons`; the final value is written back into the
/// engine's command before the game processes it.
#[derive(Debug, Clone)]
pub struct RunCommandEvent {
    pub player: PlayerRef,
    pub command_number: i32,
    pub tick_count: i32,
    pub buttons: Buttons,
    /// Buttons of this player's previous command, as sent by the client
    pub previous_buttons: Buttons,
}

/// A player's ground entity changed
#[derive(Debug, Clone)]
pub struct GroundStateEvent {
    pub player: PlayerRef,
    pub on_ground: bool,
}
