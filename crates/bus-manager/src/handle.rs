use core::fmt;
use core::mem::ManuallyDrop;
use core::ops::Deref;
use std::sync::Arc;

use tracing::error;

use crate::error::BusError;
use crate::factory::BusFactory;
use crate::manager::BusManager;
use crate::table::Shared;

/// RAII handle providing shared access to an open bus.
///
/// Dropping a handle releases it; the last release for a key closes the bus.
/// Use [`release`](Self::release) instead of dropping when the close result
/// matters, since `Drop` can only log it.
pub struct BusHandle<F: BusFactory> {
    bus: ManuallyDrop<Arc<F::Bus>>,
    slot: Arc<BusManager<F>>,
    table: Arc<Shared<F>>,
    released: bool,
}

impl<F: BusFactory> Deref for BusHandle<F> {
    type Target = F::Bus;

    #[inline]
    fn deref(&self) -> &F::Bus {
        &self.bus
    }
}

impl<F: BusFactory> Drop for BusHandle<F> {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            error!(key = ?self.slot.key(), "failed to release bus: {err}");
        }
    }
}

impl<F: BusFactory> fmt::Debug for BusHandle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusHandle")
            .field("key", self.slot.key())
            .field("users", &self.slot.user_count())
            .finish()
    }
}

impl<F: BusFactory> BusHandle<F> {
    /// Create a new handle. Only called by `BusTable`.
    pub(crate) fn new(
        table: Arc<Shared<F>>,
        slot: Arc<BusManager<F>>,
        bus: Arc<F::Bus>,
    ) -> Self {
        Self { bus: ManuallyDrop::new(bus), slot, table, released: false }
    }

    /// Returns a reference to the underlying bus.
    #[inline]
    pub fn bus(&self) -> &F::Bus {
        self
    }

    /// Returns the key of the bus this handle refers to.
    pub fn key(&self) -> &F::Key {
        self.slot.key()
    }

    /// Returns the number of handles sharing this bus, this one included.
    pub fn user_count(&self) -> usize {
        self.slot.user_count()
    }

    /// Release the handle, returning the close result if this was the last
    /// user of the bus.
    pub fn release(mut self) -> Result<(), BusError<F::Error>> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), BusError<F::Error>> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        // SAFETY: guarded by `released`, so the Arc is dropped exactly once,
        // and every later use of `self` is the no-op path above (`release`
        // consumes the handle, `Drop` is the final use).
        unsafe { ManuallyDrop::drop(&mut self.bus) };

        self.table.release(&self.slot)
    }
}
