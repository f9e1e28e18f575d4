//! State change events and listener lists.

use std::sync::Arc;

use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};

use crate::io::digital::DigitalState;

/// Token returned when a listener is added; pass it back to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitalStateChange {
    /// Id of the instance whose state changed.
    pub source: String,
    pub state: DigitalState,
    pub previous: DigitalState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalogValueChange {
    pub source: String,
    pub value: i32,
    pub previous: i32,
}

pub trait DigitalListener: Send + Sync {
    fn on_digital_change(&self, event: &DigitalStateChange);
}

impl<F> DigitalListener for F
where
    F: Fn(&DigitalStateChange) + Send + Sync,
{
    fn on_digital_change(&self, event: &DigitalStateChange) {
        self(event)
    }
}

pub trait AnalogListener: Send + Sync {
    fn on_analog_change(&self, event: &AnalogValueChange);
}

impl<F> AnalogListener for F
where
    F: Fn(&AnalogValueChange) + Send + Sync,
{
    fn on_analog_change(&self, event: &AnalogValueChange) {
        self(event)
    }
}

/// Milestones in a context's life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A platform was activated.
    Initialized { platform: String },
    /// Shutdown started. Every instance is still open.
    BeforeShutdown,
    /// Every instance is closed and every plugin has shut down.
    ShutDown,
}

pub trait LifecycleListener: Send + Sync {
    fn on_lifecycle(&self, event: &LifecycleEvent);
}

impl<F> LifecycleListener for F
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn on_lifecycle(&self, event: &LifecycleEvent) {
        self(event)
    }
}

/// Instances that publish digital state changes.
pub trait DigitalEvents: Send + Sync {
    fn add_listener(&self, listener: Arc<dyn DigitalListener>) -> ListenerId;

    /// Returns `false` if no listener with that id was registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// Instances that publish analog value changes.
pub trait AnalogEvents: Send + Sync {
    fn add_listener(&self, listener: Arc<dyn AnalogListener>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// Ordered list of listeners.
///
/// Dispatch works on a snapshot taken under the lock, so a listener may add
/// or remove listeners (itself included) while it is being notified.
pub struct Listeners<L: ?Sized> {
    entries: Mutex<Vec<(ListenerId, Arc<L>)>>,
}

impl<L: ?Sized> Default for Listeners<L> {
    fn default() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }
}

impl<L: ?Sized> Listeners<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<L>) -> ListenerId {
        let id = ListenerId::next();
        self.entries.lock().push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `f` for every listener in registration order.
    pub fn dispatch(&self, mut f: impl FnMut(&L)) {
        let snapshot: Vec<Arc<L>> =
            self.entries.lock().iter().map(|(_, l)| l.clone()).collect();
        for listener in &snapshot {
            f(listener);
        }
    }
}
