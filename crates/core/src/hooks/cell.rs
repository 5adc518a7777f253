//! Process-wide lookup from trampolines to their dispatcher
//!
//! A trampoline is a bare `extern` function written into a vtable, so it
//! cannot capture anything. Each dispatcher kind has one static
//! [`DispatcherCell`] that the composition root fills while the dispatcher
//! is live.

use std::sync::Arc;

use parking_lot::RwLock;

pub struct DispatcherCell<D> {
    slot: RwLock<Option<Arc<D>>>,
}

impl<D> DispatcherCell<D> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    pub fn attach(&self, dispatcher: Arc<D>) {
        *self.slot.write() = Some(dispatcher);
    }

    /// Clear the cell, but only if it still holds `dispatcher`
    pub fn detach(&self, dispatcher: &Arc<D>) -> bool {
        let mut slot = self.slot.write();
        match slot.as_ref() {
            Some(current) if Arc::ptr_eq(current, dispatcher) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Current dispatcher; the read lock is released before returning
    pub fn get(&self) -> Option<Arc<D>> {
        self.slot.read().clone()
    }
}

impl<D> Default for DispatcherCell<D> {
    fn default() -> Self {
        Self::new()
    }
}
