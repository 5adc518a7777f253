use super::{EntityIndex, MAX_PLAYERS};

/// Fixed per-player storage for one system
///
/// Index 0 is never handed out; storage for slot `n` lives at `n`.
pub struct PlayerDataStore<T> {
    slots: Box<[T]>,
}

impl<T: Default> PlayerDataStore<T> {
    pub fn new() -> Self {
        Self {
            slots: (0..=MAX_PLAYERS).map(|_| T::default()).collect(),
        }
    }

    pub fn get(&self, index: EntityIndex) -> &T {
        &self.slots[index.get()]
    }

    pub fn get_mut(&mut self, index: EntityIndex) -> &mut T {
        &mut self.slots[index.get()]
    }

    /// Back to the default value, on connect and disconnect
    pub fn reset(&mut self, index: EntityIndex) {
        self.slots[index.get()] = T::default();
    }

    pub fn reset_all(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = T::default());
    }
}

impl<T: Default> Default for PlayerDataStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
