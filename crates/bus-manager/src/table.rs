use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::BusError;
use crate::factory::BusFactory;
use crate::handle::BusHandle;
use crate::manager::{Acquired, BusManager, Released};

pub(crate) struct Shared<F: BusFactory> {
    pub(crate) factory: F,
    slots: Mutex<HashMap<F::Key, Arc<BusManager<F>>>>,
}

impl<F: BusFactory> Shared<F> {
    /// Remove `slot` from the table if it is still the entry for its key.
    pub(crate) fn forget(&self, slot: &Arc<BusManager<F>>) {
        let mut slots = self.slots.lock();
        if slots.get(slot.key()).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            slots.remove(slot.key());
            trace!(key = ?slot.key(), "bus slot removed");
        }
    }

    pub(crate) fn release(
        &self,
        slot: &Arc<BusManager<F>>,
    ) -> Result<(), BusError<F::Error>> {
        match slot.release(&self.factory) {
            Released::Shared => Ok(()),
            Released::Closed(result) => {
                self.forget(slot);
                result.map_err(BusError::FactoryError)
            }
            Released::Poisoned => Err(BusError::Poisoned),
        }
    }
}

/// Table of shared buses, one lazily opened bus per key.
///
/// Cloning a `BusTable` is cheap and yields another reference to the same
/// table.
pub struct BusTable<F: BusFactory> {
    shared: Arc<Shared<F>>,
}

impl<F: BusFactory> Clone for BusTable<F> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<F: BusFactory> BusTable<F> {
    /// Create an empty table backed by `factory`.
    pub fn new(factory: F) -> Self {
        Self {
            shared: Arc::new(Shared { factory, slots: Mutex::new(HashMap::new()) }),
        }
    }

    /// Acquire a handle to the bus for `key`.
    ///
    /// If the bus is not open yet it is opened via the factory. Concurrent
    /// callers for the same key wait for that single open and then share its
    /// result; callers for other keys are not blocked.
    pub fn acquire(
        &self,
        key: F::Key,
    ) -> Result<BusHandle<F>, BusError<F::Error>> {
        loop {
            let slot = {
                let mut slots = self.shared.slots.lock();
                slots
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(BusManager::new(key.clone())))
                    .clone()
            };

            match slot.acquire(&self.shared.factory) {
                Acquired::Shared(bus) => {
                    return Ok(BusHandle::new(self.shared.clone(), slot, bus));
                }
                Acquired::Retired => {
                    // Lost a race with the last release (or a failed open)
                    // of this key; drop the stale slot and look again.
                    self.shared.forget(&slot);
                }
                Acquired::OpenFailed(err) => {
                    self.shared.forget(&slot);
                    return Err(BusError::FactoryError(err));
                }
                Acquired::Poisoned => return Err(BusError::Poisoned),
            }
        }
    }

    /// Returns the number of handles currently sharing the bus for `key`.
    pub fn user_count(&self, key: &F::Key) -> usize {
        let slot = self.shared.slots.lock().get(key).cloned();
        slot.map_or(0, |s| s.user_count())
    }

    /// Returns `Some(true)` if the bus for `key` is open, `Some(false)` if
    /// not, `None` if its slot is poisoned.
    pub fn is_active(&self, key: &F::Key) -> Option<bool> {
        let slot = self.shared.slots.lock().get(key).cloned();
        slot.map_or(Some(false), |s| s.is_active())
    }

    /// Returns the number of keys with a live slot.
    pub fn len(&self) -> usize {
        self.shared.slots.lock().len()
    }

    /// Returns `true` if no bus is open or opening.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the factory backing this table.
    pub fn factory(&self) -> &F {
        &self.shared.factory
    }
}
