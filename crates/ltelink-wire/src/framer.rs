use std::time::Duration;

use ltelink_transport::{Deadline, ModemPort};
use tracing::trace;

use crate::error::{Result, WireError};
use crate::line::LineReader;

/// Locate the first occurrence of `sentinel` inside `payload`.
pub(crate) fn find_sentinel(payload: &[u8], sentinel: &[u8]) -> Option<usize> {
    if sentinel.is_empty() || payload.len() < sentinel.len() {
        return None;
    }
    payload.windows(sentinel.len()).position(|w| w == sentinel)
}

/// Write `payload` followed by the end-of-data sentinel.
///
/// A payload containing the sentinel is rejected before any byte is written;
/// the [`escape`](crate::escape) codec is the binary-safe alternative.
pub fn send_framed<P: ModemPort>(port: &mut P, payload: &[u8], sentinel: &[u8]) -> Result<()> {
    if let Some(offset) = find_sentinel(payload, sentinel) {
        return Err(WireError::SentinelInPayload { offset });
    }
    port.write_all(payload)?;
    port.write_all(sentinel)?;
    port.flush()?;
    trace!(bytes = payload.len(), "framed payload sent");
    Ok(())
}

/// [`send_framed`] in fixed-size chunks with a settle delay between them.
///
/// Without hardware flow control the modem's UART buffer overruns on large
/// writes; the pacing is load-bearing, not cosmetic.
pub fn send_framed_paced<P: ModemPort>(
    port: &mut P,
    payload: &[u8],
    sentinel: &[u8],
    chunk_size: usize,
    delay: Duration,
) -> Result<()> {
    if let Some(offset) = find_sentinel(payload, sentinel) {
        return Err(WireError::SentinelInPayload { offset });
    }
    for chunk in payload.chunks(chunk_size.max(1)) {
        port.write_all(chunk)?;
        std::thread::sleep(delay);
    }
    port.write_all(sentinel)?;
    port.flush()?;
    trace!(bytes = payload.len(), chunk_size, "paced payload sent");
    Ok(())
}

/// Receive one framed payload.
///
/// With `declared == Some(0)` the result is empty immediately and the
/// sentinel is NOT read; firmware in this family omits it for empty bodies.
/// With `Some(n)` exactly `n` bytes are consumed (at most `capacity` stored)
/// and the trailing sentinel discarded. With `None` the stream is scanned
/// for the sentinel after every byte. Overflow past `capacity` is dropped
/// silently in every case.
pub fn receive_framed<P: ModemPort>(
    line: &mut LineReader<P>,
    deadline: Deadline,
    declared: Option<usize>,
    capacity: usize,
    sentinel: &[u8],
) -> Result<Vec<u8>> {
    debug_assert!(!sentinel.is_empty());
    match declared {
        Some(0) => Ok(Vec::new()),
        Some(n) => {
            let mut raw = bytes::BytesMut::with_capacity(n);
            if line.read_block(deadline, &mut raw, n)? < n {
                return Err(WireError::TimedOut);
            }
            let mut trailer = bytes::BytesMut::with_capacity(sentinel.len());
            if line.read_block(deadline, &mut trailer, sentinel.len())? < sentinel.len() {
                return Err(WireError::TimedOut);
            }
            let mut stored = raw.to_vec();
            stored.truncate(capacity);
            Ok(stored)
        }
        None => {
            let mut stored = Vec::new();
            let mut window: Vec<u8> = Vec::with_capacity(sentinel.len());
            let mut consumed = 0usize;
            loop {
                let Some(byte) = line.next_byte(deadline)? else {
                    return Err(WireError::TimedOut);
                };
                consumed += 1;
                if stored.len() < capacity {
                    stored.push(byte);
                }
                if window.len() == sentinel.len() {
                    window.remove(0);
                }
                window.push(byte);
                if window == sentinel {
                    let body = consumed - sentinel.len();
                    stored.truncate(body.min(capacity));
                    return Ok(stored);
                }
            }
        }
    }
}
