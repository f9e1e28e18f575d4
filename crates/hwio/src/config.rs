//! Instance and context configuration.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::category::IoCategory;
use crate::error::{Error, Result};
use crate::io::digital::{DigitalState, PullResistance};

/// Trim and check an instance id.
pub fn validate_id(id: &str) -> Result<&str> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidId { id: id.to_owned() });
    }
    Ok(trimmed)
}

/// Identifies one physical bus shared by several instances.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct BusKey {
    pub category: IoCategory,
    pub bus: u32,
}

/// Backend-specific parameters of a requested instance. The variant decides
/// the instance's category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IoParams {
    DigitalInput {
        address: u32,
        #[serde(default)]
        pull: PullResistance,
        /// Debounce time in microseconds.
        #[serde(default)]
        debounce_us: u64,
    },
    DigitalOutput {
        address: u32,
        #[serde(default)]
        initial: Option<DigitalState>,
        /// State applied when the instance is closed.
        #[serde(default)]
        shutdown: Option<DigitalState>,
    },
    AnalogInput {
        address: u32,
    },
    AnalogOutput {
        address: u32,
        #[serde(default)]
        initial: Option<i32>,
    },
    Pwm {
        address: u32,
        /// Frequency in Hz.
        #[serde(default)]
        frequency: u32,
        /// Duty cycle in percent.
        #[serde(default)]
        duty_cycle: f32,
    },
    I2c {
        bus: u32,
        device: u16,
    },
    Spi {
        bus: u32,
        #[serde(default)]
        chip_select: u8,
        baud: u32,
        #[serde(default)]
        mode: u8,
    },
    Serial {
        device: String,
        baud: u32,
    },
}

impl IoParams {
    pub fn category(&self) -> IoCategory {
        match self {
            IoParams::DigitalInput { .. } => IoCategory::DigitalInput,
            IoParams::DigitalOutput { .. } => IoCategory::DigitalOutput,
            IoParams::AnalogInput { .. } => IoCategory::AnalogInput,
            IoParams::AnalogOutput { .. } => IoCategory::AnalogOutput,
            IoParams::Pwm { .. } => IoCategory::Pwm,
            IoParams::I2c { .. } => IoCategory::I2c,
            IoParams::Spi { .. } => IoCategory::Spi,
            IoParams::Serial { .. } => IoCategory::Serial,
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(Error::InvalidConfig { reason: reason.to_owned() })
        };
        match self {
            IoParams::Pwm { duty_cycle, .. }
                if !(0.0..=100.0).contains(duty_cycle) =>
            {
                invalid("PWM duty cycle must be within 0..=100")
            }
            IoParams::I2c { device, .. } if *device > 0x3ff => {
                invalid("I2C device address exceeds 10 bits")
            }
            IoParams::Spi { baud: 0, .. } | IoParams::Serial { baud: 0, .. } => {
                invalid("baud rate must be non-zero")
            }
            IoParams::Spi { mode, .. } if *mode > 3 => {
                invalid("SPI mode must be 0..=3")
            }
            IoParams::Serial { device, .. } if device.trim().is_empty() => {
                invalid("serial device path is empty")
            }
            _ => Ok(()),
        }
    }
}

/// Immutable, validated description of a requested I/O instance.
///
/// Build one with the category constructors ([`IoConfig::digital_output`],
/// [`IoConfig::i2c`], ...) or deserialize it; both paths validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IoConfigData", into = "IoConfigData")]
pub struct IoConfig {
    id: String,
    name: String,
    description: Option<String>,
    provider: Option<String>,
    params: IoParams,
}

#[derive(Serialize, Deserialize)]
struct IoConfigData {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(flatten)]
    params: IoParams,
}

impl TryFrom<IoConfigData> for IoConfig {
    type Error = Error;

    fn try_from(data: IoConfigData) -> Result<Self> {
        let mut builder = IoConfig::builder(data.id, data.params);
        if let Some(name) = data.name {
            builder = builder.name(name);
        }
        if let Some(description) = data.description {
            builder = builder.description(description);
        }
        if let Some(provider) = data.provider {
            builder = builder.provider(provider);
        }
        builder.build()
    }
}

impl From<IoConfig> for IoConfigData {
    fn from(config: IoConfig) -> Self {
        Self {
            id: config.id,
            name: Some(config.name),
            description: config.description,
            provider: config.provider,
            params: config.params,
        }
    }
}

impl IoConfig {
    pub fn builder(id: impl Into<String>, params: IoParams) -> IoConfigBuilder {
        IoConfigBuilder {
            id: id.into(),
            name: None,
            description: None,
            provider: None,
            params,
        }
    }

    pub fn digital_input(id: impl Into<String>, address: u32) -> IoConfigBuilder {
        Self::builder(
            id,
            IoParams::DigitalInput {
                address,
                pull: PullResistance::default(),
                debounce_us: 0,
            },
        )
    }

    pub fn digital_output(
        id: impl Into<String>,
        address: u32,
    ) -> IoConfigBuilder {
        Self::builder(
            id,
            IoParams::DigitalOutput { address, initial: None, shutdown: None },
        )
    }

    pub fn analog_input(id: impl Into<String>, address: u32) -> IoConfigBuilder {
        Self::builder(id, IoParams::AnalogInput { address })
    }

    pub fn analog_output(
        id: impl Into<String>,
        address: u32,
    ) -> IoConfigBuilder {
        Self::builder(id, IoParams::AnalogOutput { address, initial: None })
    }

    pub fn pwm(
        id: impl Into<String>,
        address: u32,
        frequency: u32,
    ) -> IoConfigBuilder {
        Self::builder(
            id,
            IoParams::Pwm { address, frequency, duty_cycle: 0.0 },
        )
    }

    pub fn i2c(id: impl Into<String>, bus: u32, device: u16) -> IoConfigBuilder {
        Self::builder(id, IoParams::I2c { bus, device })
    }

    pub fn spi(id: impl Into<String>, bus: u32, baud: u32) -> IoConfigBuilder {
        Self::builder(
            id,
            IoParams::Spi { bus, chip_select: 0, baud, mode: 0 },
        )
    }

    pub fn serial(
        id: impl Into<String>,
        device: impl Into<String>,
        baud: u32,
    ) -> IoConfigBuilder {
        Self::builder(id, IoParams::Serial { device: device.into(), baud })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Provider explicitly requested for this instance, bypassing platform
    /// selection.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn params(&self) -> &IoParams {
        &self.params
    }

    pub fn category(&self) -> IoCategory {
        self.params.category()
    }

    /// The shared bus this instance lives on, if its category multiplexes
    /// one.
    pub fn bus_key(&self) -> Option<BusKey> {
        match self.params {
            IoParams::I2c { bus, .. } | IoParams::Spi { bus, .. } => {
                Some(BusKey { category: self.category(), bus })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IoConfigBuilder {
    id: String,
    name: Option<String>,
    description: Option<String>,
    provider: Option<String>,
    params: IoParams,
}

impl IoConfigBuilder {
    /// Display name; defaults to the id.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Replace the parameters, e.g. to set optional fields of a variant.
    pub fn params(mut self, params: IoParams) -> Self {
        self.params = params;
        self
    }

    pub fn build(self) -> Result<IoConfig> {
        let id = validate_id(&self.id)?.to_owned();
        self.params.validate()?;
        let provider = match self.provider {
            Some(p) if p.trim().is_empty() => {
                return Err(Error::InvalidConfig {
                    reason: format!("empty provider id for [{id}]"),
                })
            }
            other => other,
        };
        Ok(IoConfig {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            description: self.description,
            provider,
            params: self.params,
        })
    }
}

/// Context-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Platform used when activation is explicit-by-config or when no
    /// platform's detection matches.
    pub default_platform: Option<String>,
    /// Load plugins that declare themselves as mocks.
    pub auto_detect_mock: bool,
    /// Activate a platform while building the context.
    pub auto_activate: bool,
    /// Instances created eagerly while building the context.
    pub instances: Vec<IoConfig>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_platform: None,
            auto_detect_mock: true,
            auto_activate: false,
            instances: Vec::new(),
        }
    }
}

impl ContextConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}
