use std::sync::Arc;

use parking_lot::Mutex;
use portable_atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

use crate::factory::BusFactory;

/// Phase state machine for one bus key.
enum Phase<B> {
    /// Slot was just inserted into the table; the bus is not open yet.
    Idle,
    /// Bus is open and shared by `users` handles.
    Active(Arc<B>),
    /// Bus was closed (or never opened) and the slot is leaving the table.
    /// Anyone still holding this slot must look the key up again.
    Retired,
    /// Bookkeeping was found inconsistent.
    Poisoned,
}

/// Outcome of an acquire attempt on a single slot.
pub(crate) enum Acquired<F: BusFactory> {
    Shared(Arc<F::Bus>),
    Retired,
    OpenFailed(F::Error),
    Poisoned,
}

/// Outcome of a release on a single slot.
pub(crate) enum Released<E> {
    /// Other handles still use the bus.
    Shared,
    /// This was the last user; the bus was closed with the given result.
    Closed(Result<(), E>),
    Poisoned,
}

/// Lifecycle manager for the bus behind one key.
///
/// The slot mutex is held across the factory's `open` and `close` so that a
/// key never sees two opens, and concurrent acquirers of the same key queue
/// up behind the first one.
pub(crate) struct BusManager<F: BusFactory> {
    key: F::Key,
    state: Mutex<Phase<F::Bus>>,
    users: AtomicUsize,
}

impl<F: BusFactory> BusManager<F> {
    pub(crate) fn new(key: F::Key) -> Self {
        Self { key, state: Mutex::new(Phase::Idle), users: AtomicUsize::new(0) }
    }

    pub(crate) fn key(&self) -> &F::Key {
        &self.key
    }

    pub(crate) fn acquire(&self, factory: &F) -> Acquired<F> {
        let mut state = self.state.lock();

        match &*state {
            Phase::Idle => match factory.open(&self.key) {
                Ok(bus) => {
                    debug!(key = ?self.key, "bus opened");
                    let bus = Arc::new(bus);
                    self.users.store(1, Ordering::Release);
                    *state = Phase::Active(bus.clone());
                    Acquired::Shared(bus)
                }
                Err(err) => {
                    // Nothing was opened; let a fresh slot retry later.
                    *state = Phase::Retired;
                    Acquired::OpenFailed(err)
                }
            },
            Phase::Active(bus) => {
                let n = self.users.fetch_add(1, Ordering::AcqRel) + 1;
                trace!(key = ?self.key, users = n, "bus shared");
                Acquired::Shared(bus.clone())
            }
            Phase::Retired => Acquired::Retired,
            Phase::Poisoned => Acquired::Poisoned,
        }
    }

    /// Drop one user. The caller must already have dropped its own clone of
    /// the bus so the last release can take sole ownership for closing.
    pub(crate) fn release(&self, factory: &F) -> Released<F::Error> {
        let mut state = self.state.lock();

        if !matches!(&*state, Phase::Active(_)) {
            return Released::Poisoned;
        }

        let n = self.users.load(Ordering::Acquire);
        if n == 0 {
            *state = Phase::Poisoned;
            return Released::Poisoned;
        }
        if n > 1 {
            self.users.store(n - 1, Ordering::Release);
            trace!(key = ?self.key, users = n - 1, "bus user released");
            return Released::Shared;
        }

        let Phase::Active(bus) = core::mem::replace(&mut *state, Phase::Retired)
        else {
            *state = Phase::Poisoned;
            return Released::Poisoned;
        };
        self.users.store(0, Ordering::Release);

        match Arc::try_unwrap(bus) {
            Ok(bus) => {
                let result = factory.close(&self.key, bus);
                debug!(key = ?self.key, ok = result.is_ok(), "bus closed");
                Released::Closed(result)
            }
            Err(bus) => {
                // A handle leaked its reference; the bus stays open.
                *state = Phase::Poisoned;
                drop(bus);
                Released::Poisoned
            }
        }
    }

    /// Returns the current number of handles sharing this bus.
    pub(crate) fn user_count(&self) -> usize {
        self.users.load(Ordering::Relaxed)
    }

    /// Returns `Some(true)` if open, `Some(false)` if not open, `None` if
    /// poisoned. Waits for an open or close in progress on this key.
    pub(crate) fn is_active(&self) -> Option<bool> {
        match &*self.state.lock() {
            Phase::Active(_) => Some(true),
            Phase::Idle | Phase::Retired => Some(false),
            Phase::Poisoned => None,
        }
    }
}
