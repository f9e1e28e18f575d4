use std::collections::VecDeque;
use std::sync::Arc;

use bus_manager::BusHandle;
use hwio::native::RawHandle;
use hwio::{
    Error, Io, IoCategory, IoConfig, IoCore, IoInstance, IoParams, NativeBackend,
    NativeError, Provider, Result, Spi,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::digital::mismatch;
use crate::native::MockNative;
use crate::{MockBusFactory, MockBusTable};

pub const SPI_PROVIDER_ID: &str = "mock-spi";

pub const SPI_IOC_WR_MODE: u64 = 0x4001_6b01;
pub const SPI_IOC_WR_MAX_SPEED_HZ: u64 = 0x4004_6b04;

#[derive(Debug, Clone, Copy)]
struct Settings {
    mode: u8,
    baud: u32,
}

impl Settings {
    /// Chip selects on one controller may differ in mode and clock, so
    /// every transaction programs both.
    fn apply(self, backend: &MockNative, fd: RawHandle) -> core::result::Result<(), NativeError> {
        backend.io_control(fd, SPI_IOC_WR_MODE, u64::from(self.mode))?;
        backend.io_control(fd, SPI_IOC_WR_MAX_SPEED_HZ, u64::from(self.baud))
    }
}

/// Mock chip select on a shared SPI controller.
///
/// Behaves like a loopback FIFO: bytes clocked out are queued and come
/// back on later reads. [`mock_prepare`](Self::mock_prepare) queues a
/// device response ahead of time.
pub struct MockSpi {
    core: IoCore,
    bus: u32,
    chip_select: u8,
    settings: Settings,
    backend: Arc<MockNative>,
    handle: Mutex<Option<BusHandle<MockBusFactory>>>,
    queue: Mutex<VecDeque<u8>>,
}

impl MockSpi {
    pub fn new(config: IoConfig, table: &MockBusTable) -> Result<Self> {
        let (IoParams::Spi { bus, chip_select, baud, mode }, Some(key)) =
            (config.params().clone(), config.bus_key())
        else {
            return Err(mismatch(&config, IoCategory::Spi));
        };

        let settings = Settings { mode, baud };
        let handle = table.acquire(key)?;
        let backend = table.factory().backend().clone();
        handle.transaction(|fd| settings.apply(&backend, fd))?;
        debug!(
            id = config.id(),
            bus,
            chip_select,
            users = handle.user_count(),
            "spi device attached"
        );

        Ok(Self {
            core: IoCore::new(config, SPI_PROVIDER_ID),
            bus,
            chip_select,
            settings,
            backend,
            handle: Mutex::new(Some(handle)),
            queue: Mutex::new(VecDeque::new()),
        })
    }

    /// Queue bytes for the next reads or transfers to return.
    pub fn mock_prepare(&self, data: &[u8]) {
        self.queue.lock().extend(data);
    }

    /// Take everything still queued.
    pub fn mock_drain(&self) -> Vec<u8> {
        self.queue.lock().drain(..).collect()
    }

    fn with_bus<R>(&self, f: impl FnOnce(&mut VecDeque<u8>) -> R) -> Result<R> {
        self.core.ensure_open()?;
        let handle = self.handle.lock();
        let handle = handle
            .as_ref()
            .ok_or_else(|| Error::Closed { id: self.id().to_owned() })?;
        let value = handle.transaction(|fd| {
            self.settings.apply(&self.backend, fd)?;
            Ok::<_, NativeError>(f(&mut self.queue.lock()))
        })?;
        Ok(value)
    }
}

impl Io for MockSpi {
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
        let handle = self.handle.lock().take();
        debug!(id = self.id(), bus = self.bus, "spi device detached");
        match handle {
            Some(handle) => handle.release().map_err(Error::from),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl Spi for MockSpi {
    fn bus(&self) -> u32 {
        self.bus
    }

    fn chip_select(&self) -> u8 {
        self.chip_select
    }

    /// Fills `read` from the queue (zeros once it runs dry), then queues
    /// `write`.
    fn transfer(&self, write: &[u8], read: &mut [u8]) -> Result<usize> {
        self.with_bus(|queue| {
            for slot in read.iter_mut() {
                *slot = queue.pop_front().unwrap_or(0);
            }
            queue.extend(write);
            write.len().max(read.len())
        })
    }

    fn write(&self, data: &[u8]) -> Result<usize> {
        self.with_bus(|queue| {
            queue.extend(data);
            data.len()
        })
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.with_bus(|queue| {
            let n = buf.len().min(queue.len());
            for (slot, byte) in buf.iter_mut().zip(queue.drain(..n)) {
                *slot = byte;
            }
            n
        })
    }
}

pub struct MockSpiProvider {
    table: MockBusTable,
}

impl MockSpiProvider {
    pub fn new(table: MockBusTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &MockBusTable {
        &self.table
    }
}

impl Provider for MockSpiProvider {
    fn id(&self) -> &str {
        SPI_PROVIDER_ID
    }

    fn name(&self) -> &str {
        "Mock SPI Provider"
    }

    fn category(&self) -> IoCategory {
        IoCategory::Spi
    }

    fn create(&self, config: &IoConfig) -> Result<IoInstance> {
        let device = MockSpi::new(config.clone(), &self.table)?;
        Ok(IoInstance::Spi(Arc::new(device)))
    }
}
