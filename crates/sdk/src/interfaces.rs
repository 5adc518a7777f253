//! Source engine object type definitions
//!
//! These are opaque types representing C++ engine objects.
//! We don't need their internal structure - just pointers.

/// Opaque type for edict_t
/// Server-side entity dictionary entry
#[repr(C)]
pub struct Edict {
    _opaque: [u8; 0],
}

/// Opaque type for IServerUnknown
/// First base of every server entity; its vtable is the one we patch
#[repr(C)]
pub struct IServerUnknown {
    _opaque: [u8; 0],
}

/// Opaque type for IMoveHelper
/// Passed through to PlayerRunCommand untouched
#[repr(C)]
pub struct IMoveHelper {
    _opaque: [u8; 0],
}

/// Opaque type for ConVar
/// Console variable object returned by ICvar::FindVar
#[repr(C)]
pub struct ConVar {
    _opaque: [u8; 0],
}

/// Opaque type for ICvar
/// Console variable system
#[repr(C)]
pub struct ICvar {
    _opaque: [u8; 0],
}

/// Invalid entity handle sentinel (`INVALID_EHANDLE_INDEX`)
pub const INVALID_EHANDLE_INDEX: u32 = 0xFFFF_FFFF;

/// Three-component float vector as laid out by the engine
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Euler angles (pitch, yaw, roll)
pub type QAngle = Vector;
