//! Forwarding of state changes from one source to many digital outputs.
//!
//! A binding subscribes to its source's listener list and, on every change,
//! drives each target in the order targets were added, on the thread that
//! reported the change. A failing target does not stop the others; the
//! failures are collected into a [`BindingError`].
//!
//! Targets are held weakly: an output that has been dropped is skipped.
//! Dropping the binding removes its listener from the source.

use core::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use portable_atomic::{AtomicBool, AtomicI32, Ordering};
use tracing::{trace, warn};

use crate::error::Error;
use crate::event::{
    AnalogEvents, AnalogListener, AnalogValueChange, DigitalEvents,
    DigitalListener, DigitalStateChange, ListenerId,
};
use crate::io::digital::{DigitalOutput, DigitalState};

/// Targets that failed while a state was being applied.
#[derive(Debug, derive_more::Error)]
pub struct BindingError {
    pub failures: Vec<(String, Error)>,
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} binding target(s) failed", self.failures.len())?;
        for (target, err) in &self.failures {
            write!(f, "; [{target}] {err}")?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Targets {
    outputs: RwLock<Vec<Weak<dyn DigitalOutput>>>,
}

impl Targets {
    fn add(&self, target: &Arc<dyn DigitalOutput>) {
        self.outputs.write().push(Arc::downgrade(target));
    }

    fn live(&self) -> Vec<Arc<dyn DigitalOutput>> {
        self.outputs.read().iter().filter_map(Weak::upgrade).collect()
    }

    /// Drive every live target to `state`. Returns how many were updated.
    fn apply(&self, state: DigitalState) -> Result<usize, BindingError> {
        if state == DigitalState::Unknown {
            return Ok(0);
        }
        let mut failures = Vec::new();
        let mut applied = 0;
        for target in self.live() {
            match target.set_state(state) {
                Ok(()) => applied += 1,
                Err(err) => failures.push((target.id().to_owned(), err)),
            }
        }
        if failures.is_empty() {
            Ok(applied)
        } else {
            Err(BindingError { failures })
        }
    }
}

type Detach = Box<dyn FnOnce() -> bool + Send>;

/// Listener registration that can be undone once.
struct Subscription {
    detach: Mutex<Option<Detach>>,
}

impl Subscription {
    fn new<S, F>(source: &Arc<S>, id: ListenerId, remove: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: FnOnce(&S, ListenerId) -> bool + Send + 'static,
    {
        let source = Arc::downgrade(source);
        let detach: Detach = Box::new(move || {
            source.upgrade().is_some_and(|s| remove(&*s, id))
        });
        Self { detach: Mutex::new(Some(detach)) }
    }

    fn detach(&self) -> bool {
        self.detach.lock().take().is_some_and(|detach| detach())
    }

    fn is_attached(&self) -> bool {
        self.detach.lock().is_some()
    }
}

struct DigitalFanOut {
    targets: Targets,
    inverted: AtomicBool,
}

impl DigitalFanOut {
    fn apply(&self, state: DigitalState) -> Result<usize, BindingError> {
        let state = if self.inverted.load(Ordering::Relaxed) {
            state.inverse()
        } else {
            state
        };
        self.targets.apply(state)
    }
}

impl DigitalListener for DigitalFanOut {
    fn on_digital_change(&self, event: &DigitalStateChange) {
        match self.apply(event.state) {
            Ok(applied) => {
                trace!(source = %event.source, state = %event.state, applied, "binding applied")
            }
            Err(err) => warn!(source = %event.source, "{err}"),
        }
    }
}

/// Mirrors a digital source (input or output) onto digital outputs.
pub struct DigitalBinding {
    fan_out: Arc<DigitalFanOut>,
    subscription: Subscription,
}

impl DigitalBinding {
    /// Subscribe to `source`, e.g. an `Arc<dyn DigitalInput>`.
    pub fn attach<S>(source: &Arc<S>) -> Self
    where
        S: DigitalEvents + ?Sized + 'static,
    {
        let fan_out = Arc::new(DigitalFanOut {
            targets: Targets::default(),
            inverted: AtomicBool::new(false),
        });
        let id = source.add_listener(fan_out.clone());
        let subscription =
            Subscription::new(source, id, |s: &S, id| s.remove_listener(id));
        Self { fan_out, subscription }
    }

    /// Apply the inverse of the source state.
    pub fn inverted(self, inverted: bool) -> Self {
        self.fan_out.inverted.store(inverted, Ordering::Relaxed);
        self
    }

    pub fn is_inverted(&self) -> bool {
        self.fan_out.inverted.load(Ordering::Relaxed)
    }

    /// Add a target. Targets are driven in the order they were added.
    pub fn add(&self, target: &Arc<dyn DigitalOutput>) -> &Self {
        self.fan_out.targets.add(target);
        self
    }

    /// Targets still alive.
    pub fn targets(&self) -> Vec<Arc<dyn DigitalOutput>> {
        self.fan_out.targets.live()
    }

    /// Drive the targets as if the source had changed to `state`.
    pub fn apply(&self, state: DigitalState) -> Result<usize, BindingError> {
        self.fan_out.apply(state)
    }

    /// Stop listening to the source. Returns `false` if already detached or
    /// the source is gone.
    pub fn detach(&self) -> bool {
        self.subscription.detach()
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_attached()
    }
}

impl Drop for DigitalBinding {
    fn drop(&mut self) {
        self.subscription.detach();
    }
}

struct ThresholdFanOut {
    targets: Targets,
    on: i32,
    off: i32,
    last: AtomicI32,
}

impl ThresholdFanOut {
    /// At or above `on` is high, at or below `off` is low, anything in
    /// between keeps the previous state.
    fn state_for(&self, value: i32) -> Option<DigitalState> {
        if value >= self.on {
            Some(DigitalState::High)
        } else if value <= self.off {
            Some(DigitalState::Low)
        } else {
            None
        }
    }

    fn apply(&self, value: i32) -> Result<usize, BindingError> {
        self.last.store(value, Ordering::Relaxed);
        match self.state_for(value) {
            Some(state) => self.targets.apply(state),
            None => Ok(0),
        }
    }
}

impl AnalogListener for ThresholdFanOut {
    fn on_analog_change(&self, event: &AnalogValueChange) {
        match self.apply(event.value) {
            Ok(applied) => {
                trace!(source = %event.source, value = event.value, applied, "threshold applied")
            }
            Err(err) => warn!(source = %event.source, "{err}"),
        }
    }
}

/// Switches digital outputs on and off from an analog source.
///
/// The gap between the two thresholds is a dead band: values inside it do
/// not change the targets.
pub struct ThresholdBinding {
    fan_out: Arc<ThresholdFanOut>,
    subscription: Subscription,
}

impl ThresholdBinding {
    /// `off` must not be above `on`.
    pub fn attach<S>(source: &Arc<S>, on: i32, off: i32) -> Result<Self, Error>
    where
        S: AnalogEvents + ?Sized + 'static,
    {
        if off > on {
            return Err(Error::InvalidConfig {
                reason: format!("off threshold {off} is above on threshold {on}"),
            });
        }
        let fan_out = Arc::new(ThresholdFanOut {
            targets: Targets::default(),
            on,
            off,
            last: AtomicI32::new(0),
        });
        let id = source.add_listener(fan_out.clone());
        let subscription =
            Subscription::new(source, id, |s: &S, id| s.remove_listener(id));
        Ok(Self { fan_out, subscription })
    }

    pub fn add(&self, target: &Arc<dyn DigitalOutput>) -> &Self {
        self.fan_out.targets.add(target);
        self
    }

    pub fn thresholds(&self) -> (i32, i32) {
        (self.fan_out.on, self.fan_out.off)
    }

    /// Last value seen from the source.
    pub fn last_value(&self) -> i32 {
        self.fan_out.last.load(Ordering::Relaxed)
    }

    pub fn apply(&self, value: i32) -> Result<usize, BindingError> {
        self.fan_out.apply(value)
    }

    pub fn detach(&self) -> bool {
        self.subscription.detach()
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_attached()
    }
}

impl Drop for ThresholdBinding {
    fn drop(&mut self) {
        self.subscription.detach();
    }
}
