use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Kind of I/O an instance provides.
///
/// Every provider serves exactly one category and every instance reports
/// one. Registry lookups compare categories exactly; there is no implicit
/// conversion between them.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IoCategory {
    #[display("digital input")]
    DigitalInput,
    #[display("digital output")]
    DigitalOutput,
    #[display("analog input")]
    AnalogInput,
    #[display("analog output")]
    AnalogOutput,
    #[display("PWM")]
    Pwm,
    #[display("I2C")]
    I2c,
    #[display("SPI")]
    Spi,
    #[display("serial")]
    Serial,
}

impl IoCategory {
    pub const ALL: [IoCategory; 8] = [
        IoCategory::DigitalInput,
        IoCategory::DigitalOutput,
        IoCategory::AnalogInput,
        IoCategory::AnalogOutput,
        IoCategory::Pwm,
        IoCategory::I2c,
        IoCategory::Spi,
        IoCategory::Serial,
    ];

    /// Returns `true` if several instances of this category multiplex one
    /// physical bus and must go through the shared bus table.
    pub fn shares_bus(self) -> bool {
        matches!(self, IoCategory::I2c | IoCategory::Spi)
    }
}
