use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bus_manager::BusHandle;
use hwio::{
    Error, I2c, Io, IoCategory, IoConfig, IoCore, IoInstance, IoParams,
    NativeBackend, NativeError, Provider, Result,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::digital::mismatch;
use crate::native::MockNative;
use crate::{MockBusFactory, MockBusTable};

pub const I2C_PROVIDER_ID: &str = "mock-i2c";

/// `ioctl` selecting the target device on an I2C bus handle.
pub const I2C_SLAVE: u64 = 0x0703;

/// Mock device on a shared I2C bus.
///
/// Writes are queued and handed back by later reads: raw writes feed raw
/// reads, register writes feed reads of the same register.
pub struct MockI2c {
    core: IoCore,
    bus: u32,
    device: u16,
    backend: Arc<MockNative>,
    handle: Mutex<Option<BusHandle<MockBusFactory>>>,
    raw: Mutex<VecDeque<u8>>,
    registers: Mutex<HashMap<u8, VecDeque<u8>>>,
}

impl MockI2c {
    pub fn new(config: IoConfig, table: &MockBusTable) -> Result<Self> {
        let (IoParams::I2c { bus, device }, Some(key)) =
            (config.params().clone(), config.bus_key())
        else {
            return Err(mismatch(&config, IoCategory::I2c));
        };

        let handle = table.acquire(key)?;
        let backend = table.factory().backend().clone();
        // Fails here, not on first use, if the device cannot be selected.
        handle.transaction(|fd| backend.io_control(fd, I2C_SLAVE, u64::from(device)))?;
        debug!(
            id = config.id(),
            bus,
            device,
            users = handle.user_count(),
            "i2c device attached"
        );

        Ok(Self {
            core: IoCore::new(config, I2C_PROVIDER_ID),
            bus,
            device,
            backend,
            handle: Mutex::new(Some(handle)),
            raw: Mutex::new(VecDeque::new()),
            registers: Mutex::new(HashMap::new()),
        })
    }

    /// Run `f` with this device selected on the bus.
    fn with_device<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        self.core.ensure_open()?;
        let handle = self.handle.lock();
        let handle = handle
            .as_ref()
            .ok_or_else(|| Error::Closed { id: self.id().to_owned() })?;
        let device = u64::from(self.device);
        let value = handle.transaction(|fd| {
            self.backend.io_control(fd, I2C_SLAVE, device)?;
            Ok::<_, NativeError>(f())
        })?;
        Ok(value)
    }
}

fn pop_into(queue: &mut VecDeque<u8>, buf: &mut [u8]) -> usize {
    let n = buf.len().min(queue.len());
    for (slot, byte) in buf.iter_mut().zip(queue.drain(..n)) {
        *slot = byte;
    }
    n
}

impl Io for MockI2c {
    fn config(&self) -> &IoConfig {
        self.core.config()
    }

    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    /// Releases this device's reference to the bus; the last device on the
    /// bus closes it.
    fn close(&self) -> Result<()> {
        if !self.core.mark_closed() {
            return Ok(());
        }
        let handle = self.handle.lock().take();
        debug!(id = self.id(), bus = self.bus, "i2c device detached");
        match handle {
            Some(handle) => handle.release().map_err(Error::from),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl I2c for MockI2c {
    fn bus(&self) -> u32 {
        self.bus
    }

    fn device(&self) -> u16 {
        self.device
    }

    fn write(&self, data: &[u8]) -> Result<usize> {
        self.with_device(|| {
            self.raw.lock().extend(data);
            data.len()
        })
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.with_device(|| pop_into(&mut self.raw.lock(), buf))
    }

    fn write_register(&self, register: u8, data: &[u8]) -> Result<usize> {
        self.with_device(|| {
            self.registers
                .lock()
                .entry(register)
                .or_default()
                .extend(data);
            data.len()
        })
    }

    fn read_register(&self, register: u8, buf: &mut [u8]) -> Result<usize> {
        self.with_device(|| {
            let mut registers = self.registers.lock();
            registers
                .get_mut(&register)
                .map_or(0, |queue| pop_into(queue, buf))
        })
    }
}

/// Provider whose devices share buses through one [`MockBusTable`].
pub struct MockI2cProvider {
    table: MockBusTable,
}

impl MockI2cProvider {
    pub fn new(table: MockBusTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &MockBusTable {
        &self.table
    }
}

impl Provider for MockI2cProvider {
    fn id(&self) -> &str {
        I2C_PROVIDER_ID
    }

    fn name(&self) -> &str {
        "Mock I2C Provider"
    }

    fn category(&self) -> IoCategory {
        IoCategory::I2c
    }

    fn create(&self, config: &IoConfig) -> Result<IoInstance> {
        let device = MockI2c::new(config.clone(), &self.table)?;
        Ok(IoInstance::I2c(Arc::new(device)))
    }
}
