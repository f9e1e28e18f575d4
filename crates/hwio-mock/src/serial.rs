use std::collections::VecDeque;
use std::sync::Arc;

use hwio::native::RawHandle;
use hwio::{
    Error, Io, IoCategory, IoConfig, IoCore, IoInstance, IoParams, NativeBackend,
    Provider, Result, Serial,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::digital::mismatch;
use crate::native::MockNative;

pub const SERIAL_PROVIDER_ID: &str = "mock-serial";

/// Mock serial port with its own native handle on the device path.
pub struct MockSerial {
    core: IoCore,
    device: String,
    baud: u32,
    backend: Arc<MockNative>,
    handle: Mutex<Option<RawHandle>>,
    rx: Mutex<VecDeque<u8>>,
    tx: Mutex<Vec<u8>>,
}

impl MockSerial {
    pub fn new(config: IoConfig, backend: Arc<MockNative>) -> Result<Self> {
        let IoParams::Serial { device, baud } = config.params().clone() else {
            return Err(mismatch(&config, IoCategory::Serial));
        };
        let handle = backend.open(&device)?;
        debug!(id = config.id(), device = %device, baud, handle, "serial port opened");
        Ok(Self {
            core: IoCore::new(config, SERIAL_PROVIDER_ID),
            device,
            baud,
            backend,
            handle: Mutex::new(Some(handle)),
            rx: Mutex::new(VecDeque::new()),
            tx: Mutex::new(Vec::new()),
        })
    }

    /// Simulate bytes arriving on the line.
    pub fn mock_receive(&self, data: &[u8]) {
        self.rx.lock().extend(data);
    }

    /// Everything written so far.
    pub fn mock_transmitted(&self) -> Vec<u8> {
        self.tx.lock().clone()
    }
}

impl Io for MockSerial {
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
        self.rx.lock().clear();
        let Some(handle) = self.handle.lock().take() else {
            return Ok(());
        };
        debug!(id = self.id(), device = %self.device, "serial port closed");
        self.backend.close(handle).map_err(Error::from)
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl Serial for MockSerial {
    fn device(&self) -> &str {
        &self.device
    }

    fn baud(&self) -> u32 {
        self.baud
    }

    fn write(&self, data: &[u8]) -> Result<usize> {
        self.core.ensure_open()?;
        self.tx.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.core.ensure_open()?;
        let mut rx = self.rx.lock();
        let n = buf.len().min(rx.len());
        for (slot, byte) in buf.iter_mut().zip(rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn available(&self) -> usize {
        self.rx.lock().len()
    }
}

pub struct MockSerialProvider {
    backend: Arc<MockNative>,
}

impl MockSerialProvider {
    pub fn new(backend: Arc<MockNative>) -> Self {
        Self { backend }
    }
}

impl Provider for MockSerialProvider {
    fn id(&self) -> &str {
        SERIAL_PROVIDER_ID
    }

    fn name(&self) -> &str {
        "Mock Serial Provider"
    }

    fn category(&self) -> IoCategory {
        IoCategory::Serial
    }

    fn create(&self, config: &IoConfig) -> Result<IoInstance> {
        let port = MockSerial::new(config.clone(), self.backend.clone())?;
        Ok(IoInstance::Serial(Arc::new(port)))
    }
}
