//! User command layouts
//!
//! `CUserCmd` differs between host builds: the CS:GO build inserts an
//! aim direction vector between the view angles and the movement fields,
//! which shifts `buttons`. Only the leading fields are declared; the
//! structures are only ever accessed through pointers handed to us by the
//! engine.

use crate::interfaces::{QAngle, Vector};

/// Input button bits (`IN_*` in `in_buttons.h`)
pub mod buttons {
    pub const IN_ATTACK: i32 = 1 << 0;
    pub const IN_JUMP: i32 = 1 << 1;
    pub const IN_DUCK: i32 = 1 << 2;
    pub const IN_FORWARD: i32 = 1 << 3;
    pub const IN_BACK: i32 = 1 << 4;
    pub const IN_USE: i32 = 1 << 5;
    pub const IN_CANCEL: i32 = 1 << 6;
    pub const IN_LEFT: i32 = 1 << 7;
    pub const IN_RIGHT: i32 = 1 << 8;
    pub const IN_MOVELEFT: i32 = 1 << 9;
    pub const IN_MOVERIGHT: i32 = 1 << 10;
    pub const IN_ATTACK2: i32 = 1 << 11;
    pub const IN_RUN: i32 = 1 << 12;
    pub const IN_RELOAD: i32 = 1 << 13;
    pub const IN_ALT1: i32 = 1 << 14;
    pub const IN_ALT2: i32 = 1 << 15;
    pub const IN_SCORE: i32 = 1 << 16;
    pub const IN_SPEED: i32 = 1 << 17;
    pub const IN_WALK: i32 = 1 << 18;
    pub const IN_ZOOM: i32 = 1 << 19;
    pub const IN_WEAPON1: i32 = 1 << 20;
    pub const IN_WEAPON2: i32 = 1 << 21;
    pub const IN_BULLRUSH: i32 = 1 << 22;
    pub const IN_GRENADE1: i32 = 1 << 23;
    pub const IN_GRENADE2: i32 = 1 << 24;
    pub const IN_ATTACK3: i32 = 1 << 25;
}

/// `CUserCmd` for generic Source builds (CS:S, TF2, HL2DM)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUserCmd {
    /// Virtual destructor table
    pub vtable: *const (),
    pub command_number: i32,
    pub tick_count: i32,
    pub viewangles: QAngle,
    pub forwardmove: f32,
    pub sidemove: f32,
    pub upmove: f32,
    pub buttons: i32,
    pub impulse: u8,
    pub weaponselect: i32,
    pub weaponsubtype: i32,
    pub random_seed: i32,
    pub mousedx: i16,
    pub mousedy: i16,
}

/// `CUserCmd` for the CS:GO build
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUserCmdCsgo {
    /// Virtual destructor table
    pub vtable: *const (),
    pub command_number: i32,
    pub tick_count: i32,
    pub viewangles: QAngle,
    pub aimdirection: Vector,
    pub forwardmove: f32,
    pub sidemove: f32,
    pub upmove: f32,
    pub buttons: i32,
    pub impulse: u8,
    pub weaponselect: i32,
    pub weaponsubtype: i32,
    pub random_seed: i32,
    pub mousedx: i16,
    pub mousedy: i16,
}

impl Default for CUserCmd {
    fn default() -> Self {
        Self {
            vtable: std::ptr::null(),
            command_number: 0,
            tick_count: 0,
            viewangles: QAngle::default(),
            forwardmove: 0.0,
            sidemove: 0.0,
            upmove: 0.0,
            buttons: 0,
            impulse: 0,
            weaponselect: 0,
            weaponsubtype: 0,
            random_seed: 0,
            mousedx: 0,
            mousedy: 0,
        }
    }
}

impl Default for CUserCmdCsgo {
    fn default() -> Self {
        Self {
            vtable: std::ptr::null(),
            command_number: 0,
            tick_count: 0,
            viewangles: QAngle::default(),
            aimdirection: Vector::default(),
            forwardmove: 0.0,
            sidemove: 0.0,
            upmove: 0.0,
            buttons: 0,
            impulse: 0,
            weaponselect: 0,
            weaponsubtype: 0,
            random_seed: 0,
            mousedx: 0,
            mousedy: 0,
        }
    }
}
