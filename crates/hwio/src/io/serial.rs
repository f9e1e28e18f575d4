use crate::error::Result;
use crate::io::Io;

pub trait Serial: Io {
    fn device(&self) -> &str;

    fn baud(&self) -> u32;

    fn write(&self, data: &[u8]) -> Result<usize>;

    /// Non-blocking read of whatever has been received.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Bytes waiting to be read.
    fn available(&self) -> usize;
}
