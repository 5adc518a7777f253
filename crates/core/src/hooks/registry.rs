//! Ordered, re-entrancy-safe listener registries
//!
//! Every dispatcher keeps one [`ListenerRegistry`] per event kind. Entries are
//! non-owning: the registry stores [`Weak`] references, so a listener that was
//! dropped without deregistering is skipped and then swept out.
//!
//! Listeners run in registration order. A listener may add or remove entries
//! (including itself) while a dispatch is running:
//! - removed entries are tombstoned and compacted after the outermost dispatch
//! - entries added mid-dispatch are first visited by the next dispatch
//!
//! No lock is held while a listener runs.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Key for registered listeners, used for removal
    pub struct ListenerKey;
}

/// Receives one kind of hook event
///
/// The event is passed mutably: listeners later in the registry see the
/// changes made by earlier ones, and the dispatcher writes the final state
/// back before calling the original game function.
pub trait Observer<E>: Send + Sync {
    fn on_event(&self, event: &mut E);
}

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Listener is already registered in '{0}'")]
    AlreadyRegistered(&'static str),
}

struct Entry<L: ?Sized, F> {
    key: ListenerKey,
    /// `None` once removed during a dispatch
    listener: Option<Weak<L>>,
    filter: F,
}

struct Inner<L: ?Sized, F> {
    entries: Vec<Entry<L, F>>,
    keys: SlotMap<ListenerKey, ()>,
    dispatch_depth: usize,
}

impl<L: ?Sized, F> Inner<L, F> {
    /// Drop tombstones and entries whose listener is gone
    ///
    /// Only valid outside a dispatch, where indices may shift.
    fn sweep(&mut self, name: &str) {
        let keys = &mut self.keys;
        self.entries.retain(|entry| match &entry.listener {
            Some(weak) if weak.strong_count() > 0 => true,
            Some(_) => {
                keys.remove(entry.key);
                tracing::trace!("{}: dropping listener that was never removed", name);
                false
            }
            None => false,
        });
    }
}

/// Ordered collection of listeners with an optional per-entry filter `F`
pub struct ListenerRegistry<L: ?Sized, F = ()> {
    name: &'static str,
    inner: Mutex<Inner<L, F>>,
}

impl<L: ?Sized, F: Clone> ListenerRegistry<L, F> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                keys: SlotMap::with_key(),
                dispatch_depth: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append `listener` with a filter value
    ///
    /// Registering the same listener object twice is rejected.
    pub fn add_with(&self, listener: &Arc<L>, filter: F) -> Result<ListenerKey, ListenerError> {
        let weak = Arc::downgrade(listener);
        let mut inner = self.inner.lock();
        if inner.dispatch_depth == 0 {
            inner.sweep(self.name);
        }

        let duplicate = inner
            .entries
            .iter()
            .filter_map(|entry| entry.listener.as_ref())
            .any(|existing| Weak::ptr_eq(existing, &weak));
        if duplicate {
            return Err(ListenerError::AlreadyRegistered(self.name));
        }

        let key = inner.keys.insert(());
        inner.entries.push(Entry {
            key,
            listener: Some(weak),
            filter,
        });

        tracing::trace!("{}: registered listener ({} total)", self.name, inner.keys.len());
        Ok(key)
    }

    /// Remove a listener by its key
    ///
    /// Returns `true` if the listener was found and removed.
    pub fn remove(&self, key: ListenerKey) -> bool {
        let mut inner = self.inner.lock();
        if inner.keys.remove(key).is_none() {
            return false;
        }
        let Some(pos) = inner.entries.iter().position(|entry| entry.key == key) else {
            return false;
        };
        Self::remove_at(&mut inner, pos);
        true
    }

    /// Remove a listener by identity
    pub fn remove_listener(&self, listener: &Arc<L>) -> bool {
        let weak = Arc::downgrade(listener);
        let mut inner = self.inner.lock();
        let Some(pos) = inner.entries.iter().position(|entry| {
            entry
                .listener
                .as_ref()
                .is_some_and(|existing| Weak::ptr_eq(existing, &weak))
        }) else {
            return false;
        };
        let key = inner.entries[pos].key;
        inner.keys.remove(key);
        Self::remove_at(&mut inner, pos);
        true
    }

    fn remove_at(inner: &mut Inner<L, F>, pos: usize) {
        if inner.dispatch_depth > 0 {
            inner.entries[pos].listener = None;
        } else {
            inner.entries.remove(pos);
        }
    }

    pub fn contains(&self, key: ListenerKey) -> bool {
        self.inner.lock().keys.contains_key(key)
    }

    /// Number of registrations whose listener is still alive
    pub fn len(&self) -> usize {
        let mut inner = self.inner.lock();
        if inner.dispatch_depth == 0 {
            inner.sweep(self.name);
        }
        inner
            .entries
            .iter()
            .filter(|entry| entry.listener.as_ref().is_some_and(|w| w.strong_count() > 0))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every live listener in registration order
    pub fn for_each(&self, mut visit: impl FnMut(&L, &F)) {
        let len = {
            let mut inner = self.inner.lock();
            inner.dispatch_depth += 1;
            inner.entries.len()
        };
        let _guard = DispatchGuard { registry: self };

        for index in 0..len {
            // Entries are never removed while dispatch_depth > 0, so indices
            // below the snapshot stay valid.
            let (listener, filter) = {
                let inner = self.inner.lock();
                let entry = &inner.entries[index];
                match &entry.listener {
                    Some(weak) => (weak.clone(), entry.filter.clone()),
                    None => continue,
                }
            };

            match listener.upgrade() {
                Some(listener) => visit(&*listener, &filter),
                None => tracing::trace!("{}: skipping dropped listener", self.name),
            }
        }
    }

    fn end_dispatch(&self) {
        let mut inner = self.inner.lock();
        inner.dispatch_depth -= 1;
        if inner.dispatch_depth == 0 {
            inner.sweep(self.name);
        }
    }
}

impl<L: ?Sized> ListenerRegistry<L, ()> {
    /// Append `listener` at the end of the registry
    pub fn add(&self, listener: &Arc<L>) -> Result<ListenerKey, ListenerError> {
        self.add_with(listener, ())
    }
}

/// Ends a dispatch even if a listener panics
struct DispatchGuard<'a, L: ?Sized, F: Clone> {
    registry: &'a ListenerRegistry<L, F>,
}

impl<L: ?Sized, F: Clone> Drop for DispatchGuard<'_, L, F> {
    fn drop(&mut self) {
        self.registry.end_dispatch();
    }
}
