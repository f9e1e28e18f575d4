use hwio::native::NativeBusFactory;
use hwio::{NativeLibrary, Plugin, PluginError, PluginService};
use tracing::info;

use crate::analog::{MockAnalogInputProvider, MockAnalogOutputProvider};
use crate::digital::{MockDigitalInputProvider, MockDigitalOutputProvider};
use crate::i2c::MockI2cProvider;
use crate::native::MockNative;
use crate::platform::MockPlatform;
use crate::pwm::MockPwmProvider;
use crate::serial::MockSerialProvider;
use crate::spi::MockSpiProvider;
use crate::MockBusTable;

pub const MOCK_PLUGIN_ID: &str = "mock";

/// Registers a provider for every category plus [`MockPlatform`], all
/// backed by one [`MockNative`].
pub struct MockPlugin {
    native: MockNative,
    library: NativeLibrary<MockNative>,
}

impl MockPlugin {
    pub fn new() -> Self {
        Self::with_native(MockNative::new())
    }

    /// Use `native` as the backend. Keep a clone to inspect what the
    /// providers did with it.
    pub fn with_native(native: MockNative) -> Self {
        Self { native, library: NativeLibrary::new("mock-native") }
    }

    pub fn native(&self) -> &MockNative {
        &self.native
    }
}

impl Default for MockPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for MockPlugin {
    fn id(&self) -> &str {
        MOCK_PLUGIN_ID
    }

    fn is_mock(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        service: &mut PluginService,
    ) -> Result<(), PluginError> {
        let backend = self.library.load_with(|| Ok(self.native.clone()))?;
        // I2C and SPI keys never collide, so both share one table.
        let buses = MockBusTable::new(NativeBusFactory::linux(backend.clone()));

        service
            .register_provider(MockDigitalInputProvider)
            .register_provider(MockDigitalOutputProvider)
            .register_provider(MockAnalogInputProvider)
            .register_provider(MockAnalogOutputProvider)
            .register_provider(MockPwmProvider)
            .register_provider(MockI2cProvider::new(buses.clone()))
            .register_provider(MockSpiProvider::new(buses))
            .register_provider(MockSerialProvider::new(backend))
            .register_platform(MockPlatform);
        info!(library = self.library.name(), "mock plugin initialized");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), PluginError> {
        self.library.unload();
        Ok(())
    }
}
