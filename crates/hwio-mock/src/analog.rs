use std::sync::Arc;

use hwio::event::{AnalogEvents, AnalogListener, AnalogValueChange, ListenerId, Listeners};
use hwio::{
    AnalogInput, AnalogOutput, Io, IoCategory, IoConfig, IoCore, IoInstance,
    IoParams, Provider, Result,
};
use portable_atomic::{AtomicI32, Ordering};
use tracing::debug;

use crate::digital::mismatch;

pub const ANALOG_INPUT_PROVIDER_ID: &str = "mock-analog-input";
pub const ANALOG_OUTPUT_PROVIDER_ID: &str = "mock-analog-output";

struct AnalogValue {
    value: AtomicI32,
    listeners: Listeners<dyn AnalogListener>,
}

impl AnalogValue {
    fn new(initial: i32) -> Self {
        Self { value: AtomicI32::new(initial), listeners: Listeners::new() }
    }

    fn get(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }

    fn set(&self, id: &str, value: i32) {
        let previous = self.value.swap(value, Ordering::AcqRel);
        if previous != value {
            let event = AnalogValueChange { source: id.to_owned(), value, previous };
            self.listeners.dispatch(|l| l.on_analog_change(&event));
        }
    }
}

pub struct MockAnalogInput {
    core: IoCore,
    value: AnalogValue,
}

impl MockAnalogInput {
    pub fn new(config: IoConfig) -> Result<Self> {
        if !matches!(config.params(), IoParams::AnalogInput { .. }) {
            return Err(mismatch(&config, IoCategory::AnalogInput));
        }
        Ok(Self {
            core: IoCore::new(config, ANALOG_INPUT_PROVIDER_ID),
            value: AnalogValue::new(0),
        })
    }

    /// Simulate a new reading.
    pub fn mock_value(&self, value: i32) {
        self.value.set(self.core.config().id(), value);
    }
}

impl Io for MockAnalogInput {
    fn config(&self) -> &IoConfig {
        self.core.config()
    }

    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    fn close(&self) -> Result<()> {
        if self.core.mark_closed() {
            self.value.listeners.clear();
            debug!(id = self.id(), "analog input closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl AnalogEvents for MockAnalogInput {
    fn add_listener(&self, listener: Arc<dyn AnalogListener>) -> ListenerId {
        self.value.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.value.listeners.remove(id)
    }
}

impl AnalogInput for MockAnalogInput {
    fn value(&self) -> Result<i32> {
        self.core.ensure_open()?;
        Ok(self.value.get())
    }
}

pub struct MockAnalogOutput {
    core: IoCore,
    value: AnalogValue,
}

impl MockAnalogOutput {
    pub fn new(config: IoConfig) -> Result<Self> {
        let IoParams::AnalogOutput { initial, .. } = *config.params() else {
            return Err(mismatch(&config, IoCategory::AnalogOutput));
        };
        Ok(Self {
            core: IoCore::new(config, ANALOG_OUTPUT_PROVIDER_ID),
            value: AnalogValue::new(initial.unwrap_or(0)),
        })
    }
}

impl Io for MockAnalogOutput {
    fn config(&self) -> &IoConfig {
        self.core.config()
    }

    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    fn close(&self) -> Result<()> {
        if self.core.mark_closed() {
            self.value.listeners.clear();
            debug!(id = self.id(), "analog output closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl AnalogEvents for MockAnalogOutput {
    fn add_listener(&self, listener: Arc<dyn AnalogListener>) -> ListenerId {
        self.value.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.value.listeners.remove(id)
    }
}

impl AnalogOutput for MockAnalogOutput {
    fn value(&self) -> i32 {
        self.value.get()
    }

    fn set_value(&self, value: i32) -> Result<()> {
        self.core.ensure_open()?;
        self.value.set(self.core.config().id(), value);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockAnalogInputProvider;

impl Provider for MockAnalogInputProvider {
    fn id(&self) -> &str {
        ANALOG_INPUT_PROVIDER_ID
    }

    fn name(&self) -> &str {
        "Mock Analog Input Provider"
    }

    fn category(&self) -> IoCategory {
        IoCategory::AnalogInput
    }

    fn create(&self, config: &IoConfig) -> Result<IoInstance> {
        let input = MockAnalogInput::new(config.clone())?;
        Ok(IoInstance::AnalogInput(Arc::new(input)))
    }
}

#[derive(Debug, Default)]
pub struct MockAnalogOutputProvider;

impl Provider for MockAnalogOutputProvider {
    fn id(&self) -> &str {
        ANALOG_OUTPUT_PROVIDER_ID
    }

    fn name(&self) -> &str {
        "Mock Analog Output Provider"
    }

    fn category(&self) -> IoCategory {
        IoCategory::AnalogOutput
    }

    fn create(&self, config: &IoConfig) -> Result<IoInstance> {
        let output = MockAnalogOutput::new(config.clone())?;
        Ok(IoInstance::AnalogOutput(Arc::new(output)))
    }
}
