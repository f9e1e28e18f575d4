use crate::error::Result;
use crate::event::AnalogEvents;
use crate::io::Io;

pub trait AnalogInput: Io + AnalogEvents {
    /// Sample the input.
    fn value(&self) -> Result<i32>;
}

pub trait AnalogOutput: Io + AnalogEvents {
    fn value(&self) -> i32;

    fn set_value(&self, value: i32) -> Result<()>;
}
