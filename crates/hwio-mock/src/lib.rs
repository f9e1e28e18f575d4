//! In-memory backend for `hwio`.
//!
//! [`MockPlugin`] registers a provider for every I/O category and a
//! [`MockPlatform`] that matches on any host. Everything runs against a
//! [`MockNative`] backend that counts opens and closes and can be told to
//! fail, so bus sharing and error paths can be exercised without hardware.
//!
//! ```ignore
//! let native = MockNative::new();
//! let context = Context::builder()
//!     .plugin(MockPlugin::with_native(native.clone()))
//!     .build()?;
//! context.activate_platform(None)?;
//! let sensor = context.create::<dyn I2c>(IoConfig::i2c("sensor", 1, 0x48).build()?)?;
//! assert!(native.is_open("/dev/i2c-1"));
//! ```

use bus_manager::BusTable;
use hwio::native::NativeBusFactory;

pub mod analog;
pub mod digital;
pub mod i2c;
pub mod native;
pub mod platform;
pub mod plugin;
pub mod pwm;
pub mod serial;
pub mod spi;

pub use analog::{
    MockAnalogInput, MockAnalogInputProvider, MockAnalogOutput,
    MockAnalogOutputProvider,
};
pub use digital::{
    MockDigitalInput, MockDigitalInputProvider, MockDigitalOutput,
    MockDigitalOutputProvider,
};
pub use i2c::{MockI2c, MockI2cProvider};
pub use native::{IoControl, MockNative};
pub use platform::{MockPlatform, MOCK_PLATFORM_ID, MOCK_PROVIDER_IDS};
pub use plugin::{MockPlugin, MOCK_PLUGIN_ID};
pub use pwm::{MockPwm, MockPwmProvider};
pub use serial::{MockSerial, MockSerialProvider};
pub use spi::{MockSpi, MockSpiProvider};

pub type MockBusFactory = NativeBusFactory<MockNative>;

/// Shared I2C and SPI buses of the mock backend.
pub type MockBusTable = BusTable<MockBusFactory>;
