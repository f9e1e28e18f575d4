use std::sync::Arc;

use hwio::event::{DigitalEvents, DigitalListener, DigitalStateChange, ListenerId, Listeners};
use hwio::{
    DigitalInput, DigitalOutput, DigitalState, Error, Io, IoCategory, IoConfig,
    IoCore, IoInstance, IoParams, Provider, PullResistance, Result,
};
use parking_lot::Mutex;
use tracing::debug;

pub const DIGITAL_INPUT_PROVIDER_ID: &str = "mock-digital-input";
pub const DIGITAL_OUTPUT_PROVIDER_ID: &str = "mock-digital-output";

/// Swap in `state` and tell the listeners if it changed.
fn change(
    id: &str,
    current: &Mutex<DigitalState>,
    listeners: &Listeners<dyn DigitalListener>,
    state: DigitalState,
) {
    let previous = core::mem::replace(&mut *current.lock(), state);
    if previous != state {
        let event = DigitalStateChange { source: id.to_owned(), state, previous };
        listeners.dispatch(|l| l.on_digital_change(&event));
    }
}

pub struct MockDigitalInput {
    core: IoCore,
    pull: PullResistance,
    state: Mutex<DigitalState>,
    listeners: Listeners<dyn DigitalListener>,
}

impl MockDigitalInput {
    pub fn new(config: IoConfig) -> Result<Self> {
        let IoParams::DigitalInput { pull, .. } = *config.params() else {
            return Err(mismatch(&config, IoCategory::DigitalInput));
        };
        // A floating pin reads low; a pulled one reads its pull level.
        let initial = match pull {
            PullResistance::PullUp => DigitalState::High,
            PullResistance::PullDown | PullResistance::Off => DigitalState::Low,
        };
        Ok(Self {
            core: IoCore::new(config, DIGITAL_INPUT_PROVIDER_ID),
            pull,
            state: Mutex::new(initial),
            listeners: Listeners::new(),
        })
    }

    /// Simulate the pin being driven to `state`.
    pub fn mock_state(&self, state: DigitalState) {
        change(self.id(), &self.state, &self.listeners, state);
    }
}

impl Io for MockDigitalInput {
    fn config(&self) -> &IoConfig {
        self.core.config()
    }

    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    fn close(&self) -> Result<()> {
        if self.core.mark_closed() {
            self.listeners.clear();
            debug!(id = self.id(), "digital input closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl DigitalEvents for MockDigitalInput {
    fn add_listener(&self, listener: Arc<dyn DigitalListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl DigitalInput for MockDigitalInput {
    fn state(&self) -> DigitalState {
        *self.state.lock()
    }

    fn pull(&self) -> PullResistance {
        self.pull
    }
}

pub struct MockDigitalOutput {
    core: IoCore,
    shutdown: Option<DigitalState>,
    state: Mutex<DigitalState>,
    listeners: Listeners<dyn DigitalListener>,
}

impl MockDigitalOutput {
    pub fn new(config: IoConfig) -> Result<Self> {
        let IoParams::DigitalOutput { initial, shutdown, .. } = *config.params()
        else {
            return Err(mismatch(&config, IoCategory::DigitalOutput));
        };
        Ok(Self {
            core: IoCore::new(config, DIGITAL_OUTPUT_PROVIDER_ID),
            shutdown,
            state: Mutex::new(initial.unwrap_or(DigitalState::Low)),
            listeners: Listeners::new(),
        })
    }
}

impl Io for MockDigitalOutput {
    fn config(&self) -> &IoConfig {
        self.core.config()
    }

    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    /// Applies the configured shutdown state, if any, before closing.
    fn close(&self) -> Result<()> {
        if !self.core.mark_closed() {
            return Ok(());
        }
        if let Some(state) = self.shutdown {
            change(self.id(), &self.state, &self.listeners, state);
        }
        self.listeners.clear();
        debug!(id = self.id(), state = %self.state(), "digital output closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl DigitalEvents for MockDigitalOutput {
    fn add_listener(&self, listener: Arc<dyn DigitalListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

impl DigitalOutput for MockDigitalOutput {
    fn state(&self) -> DigitalState {
        *self.state.lock()
    }

    fn set_state(&self, state: DigitalState) -> Result<()> {
        self.core.ensure_open()?;
        change(self.id(), &self.state, &self.listeners, state);
        Ok(())
    }
}

pub(crate) fn mismatch(config: &IoConfig, expected: IoCategory) -> Error {
    Error::TypeMismatch {
        id: config.id().to_owned(),
        expected,
        actual: config.category(),
    }
}

#[derive(Debug, Default)]
pub struct MockDigitalInputProvider;

impl Provider for MockDigitalInputProvider {
    fn id(&self) -> &str {
        DIGITAL_INPUT_PROVIDER_ID
    }

    fn name(&self) -> &str {
        "Mock Digital Input Provider"
    }

    fn category(&self) -> IoCategory {
        IoCategory::DigitalInput
    }

    fn create(&self, config: &IoConfig) -> Result<IoInstance> {
        let input = MockDigitalInput::new(config.clone())?;
        Ok(IoInstance::DigitalInput(Arc::new(input)))
    }
}

#[derive(Debug, Default)]
pub struct MockDigitalOutputProvider;

impl Provider for MockDigitalOutputProvider {
    fn id(&self) -> &str {
        DIGITAL_OUTPUT_PROVIDER_ID
    }

    fn name(&self) -> &str {
        "Mock Digital Output Provider"
    }

    fn category(&self) -> IoCategory {
        IoCategory::DigitalOutput
    }

    fn create(&self, config: &IoConfig) -> Result<IoInstance> {
        let output = MockDigitalOutput::new(config.clone())?;
        Ok(IoInstance::DigitalOutput(Arc::new(output)))
    }
}
