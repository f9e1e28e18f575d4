#![allow(dead_code)]

use std::sync::Arc;

use hwio::event::{
    AnalogEvents, AnalogListener, AnalogValueChange, DigitalEvents,
    DigitalListener, DigitalStateChange, ListenerId, Listeners,
};
use hwio::{
    AnalogInput, DigitalInput, DigitalOutput, DigitalState, Error, Io,
    IoCategory, IoConfig, IoCore, IoInstance, IoParams, NativeError,
    Provider, PullResistance, Result,
};
use parking_lot::Mutex;
use portable_atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Stub instances
// ---------------------------------------------------------------------------

/// Shared log of calls, used to check ordering across instances.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct StubDigitalOutput {
    core: IoCore,
    state: Mutex<DigitalState>,
    listeners: Listeners<dyn DigitalListener>,
    pub fail_set: AtomicBool,
    pub fail_close: AtomicBool,
    pub closes: AtomicUsize,
    log: Option<CallLog>,
}

impl StubDigitalOutput {
    pub fn new(config: IoConfig, provider: &str) -> Self {
        Self {
            core: IoCore::new(config, provider),
            state: Mutex::new(DigitalState::Low),
            listeners: Listeners::new(),
            fail_set: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            closes: AtomicUsize::new(0),
            log: None,
        }
    }

    pub fn standalone(id: &str) -> Arc<Self> {
        let config = IoConfig::digital_output(id, 0).build().unwrap();
        Arc::new(Self::new(config, "stub"))
    }

    pub fn logged(id: &str, log: &CallLog) -> Arc<Self> {
        let config = IoConfig::digital_output(id, 0).build().unwrap();
        let mut output = Self::new(config, "stub");
        output.log = Some(log.clone());
        Arc::new(output)
    }
}

impl Io for StubDigitalOutput {
    fn config(&self) -> &IoConfig {
        self.core.config()
    }

    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    fn close(&self) -> Result<()> {
        if !self.core.mark_closed() {
            return Ok(());
        }
        self.closes.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.lock().push(format!("close {}", self.id()));
        }
        self.listeners.clear();
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(NativeError::new(5, "close failed").into());
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl DigitalEvents for StubDigitalOutput {
    fn add_listener(&self, listener: Arc<dyn DigitalListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl DigitalOutput for StubDigitalOutput {
    fn state(&self) -> DigitalState {
        *self.state.lock()
    }

    fn set_state(&self, state: DigitalState) -> Result<()> {
        self.core.ensure_open()?;
        if let Some(log) = &self.log {
            log.lock().push(format!("{} {}", self.id(), state));
        }
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(NativeError::new(5, "write failed").into());
        }
        let previous = core::mem::replace(&mut *self.state.lock(), state);
        if previous != state {
            let event = DigitalStateChange {
                source: self.id().to_owned(),
                state,
                previous,
            };
            self.listeners.dispatch(|l| l.on_digital_change(&event));
        }
        Ok(())
    }
}

pub struct StubDigitalInput {
    core: IoCore,
    state: Mutex<DigitalState>,
    listeners: Listeners<dyn DigitalListener>,
}

impl StubDigitalInput {
    pub fn new(config: IoConfig, provider: &str) -> Self {
        Self {
            core: IoCore::new(config, provider),
            state: Mutex::new(DigitalState::Low),
            listeners: Listeners::new(),
        }
    }

    pub fn standalone(id: &str) -> Arc<Self> {
        let config = IoConfig::digital_input(id, 0).build().unwrap();
        Arc::new(Self::new(config, "stub"))
    }

    /// Simulate an edge on the pin.
    pub fn simulate(&self, state: DigitalState) {
        let previous = core::mem::replace(&mut *self.state.lock(), state);
        if previous != state {
            let event = DigitalStateChange {
                source: self.id().to_owned(),
                state,
                previous,
            };
            self.listeners.dispatch(|l| l.on_digital_change(&event));
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Io for StubDigitalInput {
    fn config(&self) -> &IoConfig {
        self.core.config()
    }

    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    fn close(&self) -> Result<()> {
        self.core.mark_closed();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl DigitalEvents for StubDigitalInput {
    fn add_listener(&self, listener: Arc<dyn DigitalListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl DigitalInput for StubDigitalInput {
    fn state(&self) -> DigitalState {
        *self.state.lock()
    }

    fn pull(&self) -> PullResistance {
        match self.core.config().params() {
            IoParams::DigitalInput { pull, .. } => *pull,
            _ => PullResistance::Off,
        }
    }
}

pub struct StubAnalogInput {
    core: IoCore,
    value: AtomicI32,
    listeners: Listeners<dyn AnalogListener>,
}

impl StubAnalogInput {
    pub fn standalone(id: &str) -> Arc<Self> {
        let config = IoConfig::analog_input(id, 0).build().unwrap();
        Arc::new(Self {
            core: IoCore::new(config, "stub"),
            value: AtomicI32::new(0),
            listeners: Listeners::new(),
        })
    }

    pub fn simulate(&self, value: i32) {
        let previous = self.value.swap(value, Ordering::SeqCst);
        if previous != value {
            let event = AnalogValueChange {
                source: self.id().to_owned(),
                value,
                previous,
            };
            self.listeners.dispatch(|l| l.on_analog_change(&event));
        }
    }
}

impl Io for StubAnalogInput {
    fn config(&self) -> &IoConfig {
        self.core.config()
    }

    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    fn close(&self) -> Result<()> {
        self.core.mark_closed();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl AnalogEvents for StubAnalogInput {
    fn add_listener(&self, listener: Arc<dyn AnalogListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl AnalogInput for StubAnalogInput {
    fn value(&self) -> Result<i32> {
        self.core.ensure_open()?;
        Ok(self.value.load(Ordering::SeqCst))
    }
}

// ---------------------------------------------------------------------------
// Stub provider
// ---------------------------------------------------------------------------

/// Provider creating stub digital inputs or outputs.
pub struct StubProvider {
    id: String,
    category: IoCategory,
    priority: i32,
    created: Arc<AtomicUsize>,
    fail_create: bool,
}

impl StubProvider {
    pub fn new(id: &str, category: IoCategory) -> Self {
        Self {
            id: id.to_owned(),
            category,
            priority: 0,
            created: Arc::new(AtomicUsize::new(0)),
            fail_create: false,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn created(&self) -> Arc<AtomicUsize> {
        self.created.clone()
    }
}

impl Provider for StubProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Stub Provider"
    }

    fn category(&self) -> IoCategory {
        self.category
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn create(&self, config: &IoConfig) -> Result<IoInstance> {
        if self.fail_create {
            return Err(NativeError::new(2, "no such device").into());
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        match self.category {
            IoCategory::DigitalOutput => Ok(IoInstance::DigitalOutput(Arc::new(
                StubDigitalOutput::new(config.clone(), &self.id),
            ))),
            IoCategory::DigitalInput => Ok(IoInstance::DigitalInput(Arc::new(
                StubDigitalInput::new(config.clone(), &self.id),
            ))),
            category => Err(Error::ProviderUnavailable { category }),
        }
    }
}

pub fn output_config(id: &str) -> IoConfig {
    IoConfig::digital_output(id, 1).build().unwrap()
}

pub fn input_config(id: &str) -> IoConfig {
    IoConfig::digital_input(id, 2).build().unwrap()
}
