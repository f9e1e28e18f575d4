//! Hardware I/O context.
//!
//! Application code asks a [`Context`] for named, typed I/O instances
//! (digital pins, PWM channels, I2C and SPI devices, serial ports) without
//! knowing which backend implements them:
//!
//! - [`Plugin`]s register [`Provider`]s (one per [`IoCategory`]) and
//!   [`Platform`]s (bundles of providers for one kind of hardware).
//! - The context activates one platform, explicitly or by detection.
//! - [`Context::create_instance`] hands an [`IoConfig`] to the provider
//!   that serves it and keeps the result in the [`Registry`].
//! - Instances sharing a physical bus acquire it through a
//!   [`bus_manager::BusTable`], which opens the bus once and closes it after
//!   the last user.
//!
//! ```ignore
//! let context = Context::builder().plugin(MockPlugin::new()).build()?;
//! context.activate_platform(None)?;
//! let led = context.create::<dyn DigitalOutput>(
//!     IoConfig::digital_output("led", 4).build()?,
//! )?;
//! led.high()?;
//! context.shutdown()?;
//! ```

pub mod binding;
mod category;
pub mod config;
mod context;
mod error;
pub mod event;
pub mod inject;
pub mod io;
pub mod native;
pub mod platform;
pub mod plugin;
pub mod provider;
pub mod registry;

pub use binding::{BindingError, DigitalBinding, ThresholdBinding};
pub use category::IoCategory;
pub use config::{BusKey, ContextConfig, IoConfig, IoConfigBuilder, IoParams};
pub use context::{Context, ContextBuilder, ContextState};
pub use error::{
    Error, ExtensionLoadReport, PluginFailure, Result, ShutdownReport,
};
pub use event::{LifecycleEvent, LifecycleListener};
pub use inject::{InjectionError, InjectionRequest, Wired, Wiring, WiringConfig};
pub use io::analog::{AnalogInput, AnalogOutput};
pub use io::digital::{DigitalInput, DigitalOutput, DigitalState, PullResistance};
pub use io::i2c::I2c;
pub use io::pwm::Pwm;
pub use io::serial::Serial;
pub use io::spi::Spi;
pub use io::{Io, IoCore, IoInstance, TypedIo};
pub use native::{NativeBackend, NativeError, NativeLibrary};
pub use platform::{BasicPlatform, Platform};
pub use plugin::{Plugin, PluginError, PluginService};
pub use provider::Provider;
pub use registry::Registry;
