use crate::error::Result;
use crate::io::Io;

/// One chip select on a shared SPI controller.
pub trait Spi: Io {
    fn bus(&self) -> u32;

    fn chip_select(&self) -> u8;

    /// Full-duplex transfer. Clocks out `write` while filling `read`;
    /// returns the number of bytes exchanged.
    fn transfer(&self, write: &[u8], read: &mut [u8]) -> Result<usize>;

    fn write(&self, data: &[u8]) -> Result<usize> {
        let mut sink = vec![0u8; data.len()];
        self.transfer(data, &mut sink)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let zeros = vec![0u8; buf.len()];
        self.transfer(&zeros, buf)
    }
}
