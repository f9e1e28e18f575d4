use hwio::Platform;

use crate::analog::{ANALOG_INPUT_PROVIDER_ID, ANALOG_OUTPUT_PROVIDER_ID};
use crate::digital::{DIGITAL_INPUT_PROVIDER_ID, DIGITAL_OUTPUT_PROVIDER_ID};
use crate::i2c::I2C_PROVIDER_ID;
use crate::pwm::PWM_PROVIDER_ID;
use crate::serial::SERIAL_PROVIDER_ID;
use crate::spi::SPI_PROVIDER_ID;

pub const MOCK_PLATFORM_ID: &str = "mock-platform";

/// Ids of every provider [`MockPlugin`](crate::MockPlugin) registers.
pub const MOCK_PROVIDER_IDS: [&str; 8] = [
    DIGITAL_INPUT_PROVIDER_ID,
    DIGITAL_OUTPUT_PROVIDER_ID,
    ANALOG_INPUT_PROVIDER_ID,
    ANALOG_OUTPUT_PROVIDER_ID,
    PWM_PROVIDER_ID,
    I2C_PROVIDER_ID,
    SPI_PROVIDER_ID,
    SERIAL_PROVIDER_ID,
];

/// Matches any host at the lowest priority, so real platforms win whenever
/// their detection succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockPlatform;

impl Platform for MockPlatform {
    fn id(&self) -> &str {
        MOCK_PLATFORM_ID
    }

    fn name(&self) -> &str {
        "Mock Platform"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn matches(&self) -> bool {
        true
    }

    fn provider_ids(&self) -> Vec<String> {
        MOCK_PROVIDER_IDS.iter().map(|id| (*id).to_owned()).collect()
    }
}
