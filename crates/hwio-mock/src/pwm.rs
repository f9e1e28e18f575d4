use std::sync::Arc;

use hwio::io::pwm::check_duty_cycle;
use hwio::{
    Io, IoCategory, IoConfig, IoCore, IoInstance, IoParams, Provider, Pwm,
    Result,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::digital::mismatch;

pub const PWM_PROVIDER_ID: &str = "mock-pwm";

#[derive(Debug, Clone, Copy)]
struct PwmState {
    on: bool,
    duty_cycle: f32,
    frequency: u32,
}

pub struct MockPwm {
    core: IoCore,
    state: Mutex<PwmState>,
}

impl MockPwm {
    pub fn new(config: IoConfig) -> Result<Self> {
        let IoParams::Pwm { frequency, duty_cycle, .. } = *config.params() else {
            return Err(mismatch(&config, IoCategory::Pwm));
        };
        Ok(Self {
            core: IoCore::new(config, PWM_PROVIDER_ID),
            state: Mutex::new(PwmState { on: false, duty_cycle, frequency }),
        })
    }
}

impl Io for MockPwm {
    fn config(&self) -> &IoConfig {
        self.core.config()
    }

    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    /// Turns the output off.
    fn close(&self) -> Result<()> {
        if self.core.mark_closed() {
            self.state.lock().on = false;
            debug!(id = self.id(), "pwm closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl Pwm for MockPwm {
    fn is_on(&self) -> bool {
        self.state.lock().on
    }

    fn on(&self) -> Result<()> {
        self.core.ensure_open()?;
        let mut state = self.state.lock();
        state.on = true;
        debug!(
            id = self.id(),
            duty_cycle = state.duty_cycle,
            frequency = state.frequency,
            "pwm on"
        );
        Ok(())
    }

    fn off(&self) -> Result<()> {
        self.core.ensure_open()?;
        self.state.lock().on = false;
        Ok(())
    }

    fn duty_cycle(&self) -> f32 {
        self.state.lock().duty_cycle
    }

    fn set_duty_cycle(&self, percent: f32) -> Result<()> {
        self.core.ensure_open()?;
        self.state.lock().duty_cycle = check_duty_cycle(percent)?;
        Ok(())
    }

    fn frequency(&self) -> u32 {
        self.state.lock().frequency
    }

    fn set_frequency(&self, hz: u32) -> Result<()> {
        self.core.ensure_open()?;
        self.state.lock().frequency = hz;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockPwmProvider;

impl Provider for MockPwmProvider {
    fn id(&self) -> &str {
        PWM_PROVIDER_ID
    }

    fn name(&self) -> &str {
        "Mock PWM Provider"
    }

    fn category(&self) -> IoCategory {
        IoCategory::Pwm
    }

    fn create(&self, config: &IoConfig) -> Result<IoInstance> {
        Ok(IoInstance::Pwm(Arc::new(MockPwm::new(config.clone())?)))
    }
}
