use std::time::Duration;

use bytes::{BufMut, BytesMut};
use ltelink_transport::{Deadline, ModemPort};
use tracing::trace;

use crate::error::Result;

/// Longest line the modem is known to produce, including the newline.
pub const MAX_LINE: usize = 1088;

/// Assembles newline-terminated lines and byte-counted blocks from a port.
///
/// A byte consumed is gone; callers must not assume retry-ability.
pub struct LineReader<P> {
    port: P,
}

impl<P: ModemPort> LineReader<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Next pending byte, busy-polling until `deadline`. `Ok(None)` on
    /// timeout.
    pub fn next_byte(&mut self, deadline: Deadline) -> Result<Option<u8>> {
        loop {
            if let Some(byte) = self.port.read_byte()? {
                return Ok(Some(byte));
            }
            if deadline.expired() {
                return Ok(None);
            }
            deadline.park();
        }
    }

    /// Read one line into `buf`, newline included.
    ///
    /// Returns the number of bytes stored, 0 on timeout. Bytes past the
    /// buffer's capacity are consumed and dropped; a timeout mid-line
    /// discards whatever was read so far.
    pub fn read_line(&mut self, deadline: Deadline, buf: &mut [u8]) -> Result<usize> {
        let mut len = 0usize;
        loop {
            let Some(byte) = self.next_byte(deadline)? else {
                trace!("line read timed out");
                return Ok(0);
            };
            if len < buf.len() {
                buf[len] = byte;
                len += 1;
            }
            if byte == b'\n' {
                trace!(line = ?String::from_utf8_lossy(&buf[..len]), "← modem");
                return Ok(len);
            }
        }
    }

    /// Read up to `n` bytes without a delimiter, used once a declared
    /// content length is known. Returns the count read before the deadline.
    pub fn read_block(&mut self, deadline: Deadline, buf: &mut BytesMut, n: usize) -> Result<usize> {
        buf.reserve(n);
        let mut count = 0usize;
        while count < n {
            match self.next_byte(deadline)? {
                Some(byte) => {
                    buf.put_u8(byte);
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }

    /// Wait `settle`, then discard everything pending on the port.
    pub fn drain(&mut self, settle: Duration) -> Result<()> {
        std::thread::sleep(settle);
        let mut discarded = 0usize;
        while self.port.bytes_available()? > 0 {
            if self.port.read_byte()?.is_none() {
                break;
            }
            discarded += 1;
        }
        if discarded > 0 {
            trace!(discarded, "discarded unread modem output");
        }
        Ok(())
    }

    /// Mutably borrow the underlying port.
    pub fn get_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Consume the reader and return the port.
    pub fn into_inner(self) -> P {
        self.port
    }
}
