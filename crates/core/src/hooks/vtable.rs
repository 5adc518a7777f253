//! VTable hooks via pointer replacement
//!
//! A [`VTablePatchEngine`] swaps vtable slots for trampolines, remembers the
//! original function pointers, and restores everything on
//! [`uninstall_all`](VTablePatchEngine::uninstall_all) or drop. This is the
//! only place in the crate that writes into host memory.
//!
//! Patches are keyed by (vtable address, slot). Every object of a class
//! shares one vtable, so hooking a second player of the same class is
//! reported as [`PatchError::AlreadyPatched`] instead of saving our own
//! trampoline as the "original".
//!
//! Every installed patch is also listed in a process-wide table keyed by
//! (vtable, trampoline) until its slot is restored. A trampoline can always
//! find the function to forward to through [`saved_original`], even once the
//! dispatcher that installed it is gone.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::LazyLock;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle for an installed vtable patch
    pub struct PatchKey;
}

/// Error type for patch operations
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("Invalid object: {0:#x}")]
    InvalidObject(usize),

    #[error("Slot {slot} of vtable {vtable:#x} is already patched")]
    AlreadyPatched { vtable: usize, slot: usize },

    #[error("Memory protection failed: {0}")]
    MemoryProtection(String),
}

/// One patched vtable slot
#[derive(Debug, Clone)]
pub struct PatchRecord {
    /// Debug name
    pub name: &'static str,

    /// Address of the patched vtable (identifies the object's class)
    pub vtable: usize,

    /// Index of the patched entry
    pub slot: usize,

    /// Our replacement function
    pub trampoline: *const (),

    /// Function pointer found in the slot at install time
    pub original: *const (),

    /// Address of the vtable slot
    slot_address: *mut *const (),
}

// SAFETY: Records are only created and consumed on the game thread; the
// pointers refer to host code and vtables that outlive the plugin.
unsafe impl Send for PatchRecord {}
unsafe impl Sync for PatchRecord {}

/// Originals of patches still written into host memory, as addresses
static LIVE_ORIGINALS: LazyLock<Mutex<HashMap<(usize, usize), usize>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Original function behind `trampoline` in `object`'s vtable
///
/// # Safety
/// `object` must be null or point to a live C++ object.
pub unsafe fn saved_original(object: *const c_void, trampoline: *const ()) -> Option<*const ()> {
    let vtable = read_vtable(object as *mut c_void).ok()?;
    LIVE_ORIGINALS
        .lock()
        .get(&(vtable as usize, trampoline as usize))
        .map(|&original| original as *const ())
}

/// Owns a set of vtable patches
pub struct VTablePatchEngine {
    name: &'static str,
    records: SlotMap<PatchKey, PatchRecord>,
    by_slot: HashMap<(usize, usize), PatchKey>,
}

impl VTablePatchEngine {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            records: SlotMap::with_key(),
            by_slot: HashMap::new(),
        }
    }

    /// Replace `object`'s vtable entry at `slot` with `trampoline`
    ///
    /// # Safety
    /// - `object` must point to a live C++ object (first member is the vtable pointer)
    /// - `slot` must be a valid index into that vtable
    /// - `trampoline` must have the same signature and calling convention as the original
    pub unsafe fn install(
        &mut self,
        name: &'static str,
        object: *mut c_void,
        slot: usize,
        trampoline: *const (),
    ) -> Result<PatchKey, PatchError> {
        let vtable = read_vtable(object)?;

        if self.by_slot.contains_key(&(vtable as usize, slot)) {
            return Err(PatchError::AlreadyPatched {
                vtable: vtable as usize,
                slot,
            });
        }

        let slot_address = vtable.add(slot);
        let original = *slot_address;

        // Someone already put this exact trampoline here; saving it as the
        // original would make the hook call itself forever.
        if original == trampoline {
            return Err(PatchError::AlreadyPatched {
                vtable: vtable as usize,
                slot,
            });
        }

        tracing::debug!(
            "Creating vtable hook '{}::{}': object={:x}, vtable={:x}, slot[{}]={:x}, original={:x}",
            self.name,
            name,
            object as usize,
            vtable as usize,
            slot,
            slot_address as usize,
            original as usize
        );

        write_slot(slot_address, trampoline)?;

        let key = self.track(PatchRecord {
            name,
            vtable: vtable as usize,
            slot,
            trampoline,
            original,
            slot_address,
        });

        tracing::info!("Created vtable hook '{}::{}' at index {}", self.name, name, slot);

        Ok(key)
    }

    /// Original function for `object`'s class at `slot`
    ///
    /// # Safety
    /// `object` must be null or point to a live C++ object.
    pub unsafe fn original(&self, object: *const c_void, slot: usize) -> Option<*const ()> {
        let vtable = read_vtable(object as *mut c_void).ok()?;
        self.original_for_vtable(vtable as usize, slot)
    }

    /// Original function for a vtable address and slot
    pub fn original_for_vtable(&self, vtable: usize, slot: usize) -> Option<*const ()> {
        self.by_slot
            .get(&(vtable, slot))
            .and_then(|key| self.records.get(*key))
            .map(|record| record.original)
    }

    fn track(&mut self, record: PatchRecord) -> PatchKey {
        let (vtable, slot) = (record.vtable, record.slot);
        LIVE_ORIGINALS.lock().insert(
            (vtable, record.trampoline as usize),
            record.original as usize,
        );
        let key = self.records.insert(record);
        self.by_slot.insert((vtable, slot), key);
        key
    }

    /// Restore every original pointer
    ///
    /// Returns the number of slots restored. A slot that cannot be written
    /// back keeps its record, so [`len`](Self::len) counts the patches still
    /// live and a later call retries them. Safe to call repeatedly.
    pub fn uninstall_all(&mut self) -> usize {
        let name = self.name;
        let mut restored = 0;

        self.records.retain(|_, record| {
            // SAFETY: slot_address pointed into a live vtable at install time
            // and restore checks that it is still mapped before touching it.
            let result = unsafe { restore(name, record) };

            match result {
                Ok(()) => {
                    restored += 1;
                    LIVE_ORIGINALS
                        .lock()
                        .remove(&(record.vtable, record.trampoline as usize));
                    tracing::info!("Removed vtable hook '{}::{}'", name, record.name);
                    false
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to restore vtable hook '{}::{}': {}",
                        name,
                        record.name,
                        e
                    );
                    true
                }
            }
        });

        let records = &self.records;
        self.by_slot.retain(|_, key| records.contains_key(*key));
        restored
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Drop for VTablePatchEngine {
    fn drop(&mut self) {
        self.uninstall_all();
    }
}

/// Put `record`'s original back into its slot
unsafe fn restore(engine: &str, record: &PatchRecord) -> Result<(), PatchError> {
    let mapping = region::query(record.slot_address as *const u8)
        .map_err(|e| PatchError::MemoryProtection(e.to_string()))?;
    if mapping.is_readable() && *record.slot_address != record.trampoline {
        tracing::warn!(
            "VTable slot '{}::{}' was re-hooked by someone else, restoring anyway",
            engine,
            record.name
        );
    }
    write_slot(record.slot_address, record.original)
}

/// Read the vtable pointer (first member) of a C++ object
unsafe fn read_vtable(object: *mut c_void) -> Result<*mut *const (), PatchError> {
    if object.is_null() {
        return Err(PatchError::InvalidObject(0));
    }
    let vtable = *(object as *const *mut *const ());
    if vtable.is_null() {
        return Err(PatchError::InvalidObject(object as usize));
    }
    Ok(vtable)
}

/// Write one vtable entry, temporarily making it writable
unsafe fn write_slot(slot_address: *mut *const (), value: *const ()) -> Result<(), PatchError> {
    // The guard restores the previous protection when dropped
    let _guard = region::protect_with_handle(
        slot_address as *const u8,
        std::mem::size_of::<usize>(),
        region::Protection::READ_WRITE,
    )
    .map_err(|e| PatchError::MemoryProtection(e.to_string()))?;

    std::ptr::write_volatile(slot_address, value);
    Ok(())
}
