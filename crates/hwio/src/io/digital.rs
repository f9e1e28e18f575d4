use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::DigitalEvents;
use crate::io::Io;

#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DigitalState {
    #[display("LOW")]
    Low,
    #[display("HIGH")]
    High,
    #[display("UNKNOWN")]
    Unknown,
}

impl DigitalState {
    pub fn from_bool(high: bool) -> Self {
        if high {
            DigitalState::High
        } else {
            DigitalState::Low
        }
    }

    pub fn is_high(self) -> bool {
        self == DigitalState::High
    }

    pub fn is_low(self) -> bool {
        self == DigitalState::Low
    }

    /// `Unknown` stays `Unknown`.
    pub fn inverse(self) -> Self {
        match self {
            DigitalState::Low => DigitalState::High,
            DigitalState::High => DigitalState::Low,
            DigitalState::Unknown => DigitalState::Unknown,
        }
    }
}

#[derive(
    Debug,
    Display,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PullResistance {
    #[default]
    #[display("off")]
    Off,
    #[display("pull-up")]
    PullUp,
    #[display("pull-down")]
    PullDown,
}

pub trait DigitalInput: Io + DigitalEvents {
    fn state(&self) -> DigitalState;

    fn pull(&self) -> PullResistance;

    fn is_high(&self) -> bool {
        self.state().is_high()
    }

    fn is_low(&self) -> bool {
        self.state().is_low()
    }
}

pub trait DigitalOutput: Io + DigitalEvents {
    fn state(&self) -> DigitalState;

    /// Drive the output. Listeners are notified only if the state changes.
    fn set_state(&self, state: DigitalState) -> Result<()>;

    fn high(&self) -> Result<()> {
        self.set_state(DigitalState::High)
    }

    fn low(&self) -> Result<()> {
        self.set_state(DigitalState::Low)
    }

    fn toggle(&self) -> Result<()> {
        self.set_state(self.state().inverse())
    }

    fn is_high(&self) -> bool {
        self.state().is_high()
    }

    fn is_low(&self) -> bool {
        self.state().is_low()
    }
}
