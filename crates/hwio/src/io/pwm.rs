use crate::error::{Error, Result};
use crate::io::Io;

pub trait Pwm: Io {
    fn is_on(&self) -> bool;

    /// Start the output with the current duty cycle and frequency.
    fn on(&self) -> Result<()>;

    fn off(&self) -> Result<()>;

    /// Duty cycle in percent.
    fn duty_cycle(&self) -> f32;

    fn set_duty_cycle(&self, percent: f32) -> Result<()>;

    /// Frequency in Hz.
    fn frequency(&self) -> u32;

    fn set_frequency(&self, hz: u32) -> Result<()>;
}

/// Reject duty cycles outside `0..=100`.
pub fn check_duty_cycle(percent: f32) -> Result<f32> {
    if !(0.0..=100.0).contains(&percent) {
        return Err(Error::InvalidConfig {
            reason: format!("duty cycle {percent} is outside 0..=100"),
        });
    }
    Ok(percent)
}
