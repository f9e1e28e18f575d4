//! I/O capability traits and the type-erased [`IoInstance`].
//!
//! There is one trait per [`IoCategory`]. Providers return instances wrapped
//! in [`IoInstance`]; typed access goes through [`TypedIo`], implemented for
//! each category's trait object (`dyn DigitalOutput`, `dyn I2c`, ...).

use core::fmt;
use std::sync::Arc;

use portable_atomic::{AtomicBool, Ordering};

use crate::category::IoCategory;
use crate::config::IoConfig;
use crate::error::{Error, Result};

pub mod analog;
pub mod digital;
pub mod i2c;
pub mod pwm;
pub mod serial;
pub mod spi;

use analog::{AnalogInput, AnalogOutput};
use digital::{DigitalInput, DigitalOutput};
use i2c::I2c;
use pwm::Pwm;
use serial::Serial;
use spi::Spi;

/// Behaviour shared by every live I/O instance.
pub trait Io: Send + Sync + 'static {
    fn config(&self) -> &IoConfig;

    /// Id of the provider that created this instance.
    fn provider_id(&self) -> &str;

    /// Release everything the instance holds. Closing twice is a no-op.
    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;

    fn id(&self) -> &str {
        self.config().id()
    }

    fn name(&self) -> &str {
        self.config().name()
    }

    fn category(&self) -> IoCategory {
        self.config().category()
    }
}

/// Bookkeeping most instances need: their config, creator and closed flag.
#[derive(Debug)]
pub struct IoCore {
    config: IoConfig,
    provider_id: String,
    closed: AtomicBool,
}

impl IoCore {
    pub fn new(config: IoConfig, provider_id: impl Into<String>) -> Self {
        Self {
            config,
            provider_id: provider_id.into(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &IoConfig {
        &self.config
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the instance closed. Returns `true` only for the first call.
    pub fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Fails with [`Error::Closed`] once the instance is closed.
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed { id: self.config.id().to_owned() });
        }
        Ok(())
    }
}

/// A live instance of any category.
#[derive(Clone)]
pub enum IoInstance {
    DigitalInput(Arc<dyn DigitalInput>),
    DigitalOutput(Arc<dyn DigitalOutput>),
    AnalogInput(Arc<dyn AnalogInput>),
    AnalogOutput(Arc<dyn AnalogOutput>),
    Pwm(Arc<dyn Pwm>),
    I2c(Arc<dyn I2c>),
    Spi(Arc<dyn Spi>),
    Serial(Arc<dyn Serial>),
}

macro_rules! dispatch {
    ($instance:expr, $io:ident => $body:expr) => {
        match $instance {
            IoInstance::DigitalInput($io) => $body,
            IoInstance::DigitalOutput($io) => $body,
            IoInstance::AnalogInput($io) => $body,
            IoInstance::AnalogOutput($io) => $body,
            IoInstance::Pwm($io) => $body,
            IoInstance::I2c($io) => $body,
            IoInstance::Spi($io) => $body,
            IoInstance::Serial($io) => $body,
        }
    };
}

impl IoInstance {
    /// Category of the variant. Always equal to the instance's own
    /// [`Io::category`] for well-behaved providers.
    pub fn category(&self) -> IoCategory {
        match self {
            IoInstance::DigitalInput(_) => IoCategory::DigitalInput,
            IoInstance::DigitalOutput(_) => IoCategory::DigitalOutput,
            IoInstance::AnalogInput(_) => IoCategory::AnalogInput,
            IoInstance::AnalogOutput(_) => IoCategory::AnalogOutput,
            IoInstance::Pwm(_) => IoCategory::Pwm,
            IoInstance::I2c(_) => IoCategory::I2c,
            IoInstance::Spi(_) => IoCategory::Spi,
            IoInstance::Serial(_) => IoCategory::Serial,
        }
    }

    pub fn config(&self) -> &IoConfig {
        dispatch!(self, io => io.config())
    }

    pub fn id(&self) -> &str {
        dispatch!(self, io => io.id())
    }

    pub fn name(&self) -> &str {
        dispatch!(self, io => io.name())
    }

    pub fn provider_id(&self) -> &str {
        dispatch!(self, io => io.provider_id())
    }

    pub fn close(&self) -> Result<()> {
        dispatch!(self, io => io.close())
    }

    pub fn is_closed(&self) -> bool {
        dispatch!(self, io => io.is_closed())
    }

    /// Downcast to a category trait object, e.g. `typed::<dyn Pwm>()`.
    pub fn typed<T: TypedIo + ?Sized>(&self) -> Option<Arc<T>> {
        T::from_instance(self)
    }

    /// Like [`typed`](Self::typed) but reports the mismatch.
    pub fn expect_typed<T: TypedIo + ?Sized>(&self) -> Result<Arc<T>> {
        T::from_instance(self).ok_or_else(|| Error::TypeMismatch {
            id: self.id().to_owned(),
            expected: T::CATEGORY,
            actual: self.category(),
        })
    }
}

impl fmt::Debug for IoInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoInstance")
            .field("id", &self.id())
            .field("category", &self.category())
            .field("provider", &self.provider_id())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Category trait objects that can be stored in and taken out of an
/// [`IoInstance`].
pub trait TypedIo: Io {
    const CATEGORY: IoCategory;

    fn from_instance(instance: &IoInstance) -> Option<Arc<Self>>;

    fn into_instance(this: Arc<Self>) -> IoInstance;
}

macro_rules! typed_io {
    ($($variant:ident => $trait:ident),* $(,)?) => {
        $(
            impl TypedIo for dyn $trait {
                const CATEGORY: IoCategory = IoCategory::$variant;

                fn from_instance(instance: &IoInstance) -> Option<Arc<Self>> {
                    match instance {
                        IoInstance::$variant(io) => Some(io.clone()),
                        _ => None,
                    }
                }

                fn into_instance(this: Arc<Self>) -> IoInstance {
                    IoInstance::$variant(this)
                }
            }

            impl fmt::Debug for dyn $trait {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($trait))
                        .field("id", &self.id())
                        .field("provider", &self.provider_id())
                        .field("closed", &self.is_closed())
                        .finish()
                }
            }

            impl From<Arc<dyn $trait>> for IoInstance {
                fn from(io: Arc<dyn $trait>) -> Self {
                    IoInstance::$variant(io)
                }
            }
        )*
    };
}

typed_io! {
    DigitalInput => DigitalInput,
    DigitalOutput => DigitalOutput,
    AnalogInput => AnalogInput,
    AnalogOutput => AnalogOutput,
    Pwm => Pwm,
    I2c => I2c,
    Spi => Spi,
    Serial => Serial,
}
