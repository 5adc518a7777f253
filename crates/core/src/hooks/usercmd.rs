//! Build-independent access to user commands
//!
//! The run-command hook receives a pointer to the engine's `CUserCmd`, whose
//! layout depends on the host build. [`CommandLayout`] hides that difference
//! so dispatchers and listeners only ever see [`Buttons`].

use std::ffi::c_void;

use bitflags::bitflags;
use ncz_sdk::usercmd::buttons::*;
use ncz_sdk::{CUserCmd, CUserCmdCsgo, HostBuild};

bitflags! {
    /// Input buttons held during a user command
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Buttons: i32 {
        const ATTACK = IN_ATTACK;
        const JUMP = IN_JUMP;
        const DUCK = IN_DUCK;
        const FORWARD = IN_FORWARD;
        const BACK = IN_BACK;
        const USE = IN_USE;
        const CANCEL = IN_CANCEL;
        const LEFT = IN_LEFT;
        const RIGHT = IN_RIGHT;
        const MOVELEFT = IN_MOVELEFT;
        const MOVERIGHT = IN_MOVERIGHT;
        const ATTACK2 = IN_ATTACK2;
        const RUN = IN_RUN;
        const RELOAD = IN_RELOAD;
        const ALT1 = IN_ALT1;
        const ALT2 = IN_ALT2;
        const SCORE = IN_SCORE;
        const SPEED = IN_SPEED;
        const WALK = IN_WALK;
        const ZOOM = IN_ZOOM;
        const WEAPON1 = IN_WEAPON1;
        const WEAPON2 = IN_WEAPON2;
        const BULLRUSH = IN_BULLRUSH;
        const GRENADE1 = IN_GRENADE1;
        const GRENADE2 = IN_GRENADE2;
        const ATTACK3 = IN_ATTACK3;
    }
}

/// The fields of a user command the dispatcher forwards to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandView {
    pub command_number: i32,
    pub tick_count: i32,
    pub buttons: Buttons,
}

/// Which `CUserCmd` layout the host uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandLayout {
    Generic,
    Csgo,
}

impl CommandLayout {
    pub fn for_build(build: HostBuild) -> Self {
        match build {
            HostBuild::Generic => CommandLayout::Generic,
            HostBuild::CounterStrikeGlobalOffensive => CommandLayout::Csgo,
        }
    }

    /// # Safety
    /// `cmd` must point to a live command of this layout.
    pub unsafe fn read(self, cmd: *const c_void) -> CommandView {
        let (command_number, tick_count, buttons) = match self {
            CommandLayout::Generic => {
                let cmd = &*(cmd as *const CUserCmd);
                (cmd.command_number, cmd.tick_count, cmd.buttons)
            }
            CommandLayout::Csgo => {
                let cmd = &*(cmd as *const CUserCmdCsgo);
                (cmd.command_number, cmd.tick_count, cmd.buttons)
            }
        };
        CommandView {
            command_number,
            tick_count,
            buttons: Buttons::from_bits_retain(buttons),
        }
    }

    /// # Safety
    /// `cmd` must point to a live, writable command of this layout.
    pub unsafe fn write_buttons(self, cmd: *mut c_void, buttons: Buttons) {
        match self {
            CommandLayout::Generic => (*(cmd as *mut CUserCmd)).buttons = buttons.bits(),
            CommandLayout::Csgo => (*(cmd as *mut CUserCmdCsgo)).buttons = buttons.bits(),
        }
    }
}
