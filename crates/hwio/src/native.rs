//! Boundary to the native collaborator.
//!
//! The framework never talks to hardware itself. Backends implement
//! [`NativeBackend`] on top of whatever does (a kernel driver, a C library,
//! a simulator) and the framework only sees handles and error codes.

use std::sync::Arc;

use bus_manager::BusFactory;
use derive_more::{Display, Error};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::debug;

use crate::category::IoCategory;
use crate::config::BusKey;

/// Opaque handle returned by a native `open`.
pub type RawHandle = i32;

/// Error reported by a native collaborator, passed through unmodified.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("native error {code}: {message}")]
pub struct NativeError {
    pub code: i32,
    pub message: String,
}

impl NativeError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Build an error from the backend's last error code and its
    /// description.
    pub fn last<B: NativeBackend + ?Sized>(backend: &B) -> Self {
        let code = backend.last_error_code();
        Self { code, message: backend.describe_error(code) }
    }
}

/// Calls the framework consumes from a native library.
///
/// Every call may block; none has a timeout of its own.
pub trait NativeBackend: Send + Sync + 'static {
    fn open(&self, path: &str) -> Result<RawHandle, NativeError>;

    fn close(&self, handle: RawHandle) -> Result<(), NativeError>;

    fn io_control(
        &self,
        handle: RawHandle,
        command: u64,
        value: u64,
    ) -> Result<(), NativeError>;

    fn last_error_code(&self) -> i32;

    fn describe_error(&self, code: i32) -> String;
}

/// Explicitly initialized native library.
///
/// Loading is idempotent and thread-safe: the first successful
/// [`load_with`](Self::load_with) wins and later calls return the same
/// backend. Nothing is loaded as a side effect of linking or first use.
pub struct NativeLibrary<B: NativeBackend> {
    name: &'static str,
    backend: OnceCell<Arc<B>>,
}

impl<B: NativeBackend> NativeLibrary<B> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, backend: OnceCell::new() }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Load the library with `loader` unless it is already loaded.
    pub fn load_with<L>(&self, loader: L) -> Result<Arc<B>, NativeError>
    where
        L: FnOnce() -> Result<B, NativeError>,
    {
        self.backend
            .get_or_try_init(|| {
                debug!(library = self.name, "loading native library");
                loader().map(Arc::new)
            })
            .cloned()
    }

    pub fn get(&self) -> Option<Arc<B>> {
        self.backend.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.get().is_some()
    }

    /// Tear the library down. Handles that are still alive keep their own
    /// reference to the backend.
    pub fn unload(&mut self) -> Option<Arc<B>> {
        let backend = self.backend.take();
        if let Some(backend) = &backend {
            let holders = Arc::strong_count(backend) - 1;
            debug!(library = self.name, holders, "native library unloaded");
        }
        backend
    }
}

/// An open bus device file owned by the shared bus table.
///
/// Every instance on the bus shares the one handle; each transaction runs
/// under the bus lock so device selection and transfer are not interleaved
/// with another instance's.
#[derive(Debug)]
pub struct NativeBus {
    key: BusKey,
    path: String,
    handle: RawHandle,
    lock: Mutex<()>,
}

impl NativeBus {
    pub fn key(&self) -> BusKey {
        self.key
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    /// Run `f` with exclusive use of the bus.
    pub fn transaction<R>(&self, f: impl FnOnce(RawHandle) -> R) -> R {
        let _guard = self.lock.lock();
        f(self.handle)
    }
}

/// [`BusFactory`] opening bus device files through a [`NativeBackend`].
///
/// Paths come from `path_for`, e.g. `/dev/i2c-{bus}` for I2C.
pub struct NativeBusFactory<B: NativeBackend> {
    backend: Arc<B>,
    path_for: fn(&BusKey) -> String,
}

impl<B: NativeBackend> NativeBusFactory<B> {
    pub fn new(backend: Arc<B>, path_for: fn(&BusKey) -> String) -> Self {
        Self { backend, path_for }
    }

    /// Factory using the Linux device naming scheme.
    pub fn linux(backend: Arc<B>) -> Self {
        Self::new(backend, linux_bus_path)
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}

/// `/dev/i2c-N` for I2C, `/dev/spidevN.0` for SPI.
pub fn linux_bus_path(key: &BusKey) -> String {
    match key.category {
        IoCategory::Spi => format!("/dev/spidev{}.0", key.bus),
        _ => format!("/dev/i2c-{}", key.bus),
    }
}

impl<B: NativeBackend> BusFactory for NativeBusFactory<B> {
    type Key = BusKey;
    type Bus = NativeBus;
    type Error = NativeError;

    fn open(&self, key: &BusKey) -> Result<NativeBus, NativeError> {
        let path = (self.path_for)(key);
        let handle = self.backend.open(&path)?;
        debug!(key = ?key, path = %path, handle, "bus opened");
        Ok(NativeBus { key: *key, path, handle, lock: Mutex::new(()) })
    }

    fn close(&self, key: &BusKey, bus: NativeBus) -> Result<(), NativeError> {
        debug!(key = ?key, path = %bus.path, "closing bus");
        self.backend.close(bus.handle)
    }
}
