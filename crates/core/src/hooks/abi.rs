//! Calling conventions of the hooked member functions
//!
//! The hooked functions are C++ member functions. On 32-bit Windows they use
//! `thiscall` (`this` in ecx); a `fastcall` function with a dummy second
//! argument (edx) has the same register layout. Everywhere else `this` is an
//! ordinary first argument.
//!
//! Each hook shape gets a function pointer type, the trampoline written into
//! the vtable, and a helper to call the original. Dispatchers only see the
//! normalized `(this, args...)` form.

use std::ffi::c_void;

use ncz_sdk::{IMoveHelper, Vector};

macro_rules! member_hook {
    (
        $(#[$meta:meta])*
        $fn_ty:ident, $trampoline:ident, $call:ident => $handler:path,
        ($($arg:ident: $ty:ty),*)
    ) => {
        $(#[$meta])*
        #[cfg(all(windows, target_arch = "x86"))]
        pub type $fn_ty = unsafe extern "fastcall" fn(*mut c_void, *mut c_void $(, $ty)*);
        $(#[$meta])*
        #[cfg(not(all(windows, target_arch = "x86")))]
        pub type $fn_ty = unsafe extern "C" fn(*mut c_void $(, $ty)*);

        #[cfg(all(windows, target_arch = "x86"))]
        pub unsafe extern "fastcall" fn $trampoline(
            this: *mut c_void,
            _edx: *mut c_void
            $(, $arg: $ty)*
        ) {
            $handler(this $(, $arg)*)
        }

        #[cfg(not(all(windows, target_arch = "x86")))]
        pub unsafe extern "C" fn $trampoline(this: *mut c_void $(, $arg: $ty)*) {
            $handler(this $(, $arg)*)
        }

        /// # Safety
        /// `original` must be a function of this shape and `this` a live object.
        pub unsafe fn $call(original: *const (), this: *mut c_void $(, $arg: $ty)*) {
            let original: $fn_ty = std::mem::transmute(original);
            #[cfg(all(windows, target_arch = "x86"))]
            original(this, std::ptr::null_mut() $(, $arg)*);
            #[cfg(not(all(windows, target_arch = "x86")))]
            original(this $(, $arg)*);
        }
    };
}

member_hook! {
    /// `CBasePlayer::Weapon_Equip(CBaseCombatWeapon*)`
    WeaponEquipFn, weapon_equip_trampoline, call_weapon_equip
        => super::weapon::weapon_equip_hook,
    (weapon: *mut c_void)
}

member_hook! {
    /// `CBasePlayer::Weapon_Drop(CBaseCombatWeapon*, const Vector*, const Vector*)`
    WeaponDropFn, weapon_drop_trampoline, call_weapon_drop
        => super::weapon::weapon_drop_hook,
    (weapon: *mut c_void, target: *const Vector, velocity: *const Vector)
}

member_hook! {
    /// `CBasePlayer::PlayerRunCommand(CUserCmd*, IMoveHelper*)`
    RunCommandFn, run_command_trampoline, call_run_command
        => super::run_command::run_command_hook,
    (cmd: *mut c_void, move_helper: *mut IMoveHelper)
}

member_hook! {
    /// `NetworkStateChanged` for `m_hGroundEntity`, receiving the new handle
    GroundEntityFn, ground_entity_trampoline, call_ground_entity
        => super::ground::ground_entity_hook,
    (handle: *const u32)
}
