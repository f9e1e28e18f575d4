use crate::error::Result;
use crate::io::Io;

/// One device on a shared I2C bus.
pub trait I2c: Io {
    fn bus(&self) -> u32;

    fn device(&self) -> u16;

    /// Raw write to the device. Returns the number of bytes written.
    fn write(&self, data: &[u8]) -> Result<usize>;

    /// Raw read from the device. Returns the number of bytes read.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    fn write_register(&self, register: u8, data: &[u8]) -> Result<usize>;

    fn read_register(&self, register: u8, buf: &mut [u8]) -> Result<usize>;

    fn write_byte(&self, byte: u8) -> Result<()> {
        self.write(&[byte]).map(drop)
    }

    /// `None` if the device had nothing to return.
    fn read_byte(&self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        let n = self.read(&mut buf)?;
        Ok((n == 1).then_some(buf[0]))
    }

    fn write_register_byte(&self, register: u8, byte: u8) -> Result<()> {
        self.write_register(register, &[byte]).map(drop)
    }

    fn read_register_byte(&self, register: u8) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        let n = self.read_register(register, &mut buf)?;
        Ok((n == 1).then_some(buf[0]))
    }
}
