use crate::error::Result;

/// A bidirectional byte channel to the modem.
///
/// The channel is poll-style: reads never block, and callers pace themselves
/// against a [`Deadline`](crate::Deadline). One reader/writer at a time; the
/// engine serializes access at its public boundary.
pub trait ModemPort {
    /// Read a single byte if one is pending. `Ok(None)` means nothing is
    /// buffered right now, not end of stream.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Number of bytes currently buffered on the receive side.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Write the whole buffer to the port.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Block until buffered output has been handed to the device.
    fn flush(&mut self) -> Result<()>;
}

impl<P: ModemPort + ?Sized> ModemPort for &mut P {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
