use ltelink_transport::{Deadline, ModemPort};
use tracing::{debug, trace};

use crate::error::{Result, WireError};
use crate::line::{LineReader, MAX_LINE};

/// How a command exchange terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// The modem answered `OK`.
    Success,
    /// The modem answered `ERROR`.
    ModemError,
    /// No terminal line arrived before the deadline.
    TimedOut,
}

/// One classified command exchange: terminal status plus everything the
/// modem printed before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: ResponseStatus,
    pub payload: Vec<u8>,
}

/// Collect response lines until a terminal status line or the deadline.
///
/// Non-terminal lines accumulate into the payload, silently truncated at
/// `capacity`; overflow is dropped, never an error. This is the single
/// synchronization primitive nearly every engine operation goes through.
pub fn await_response<P: ModemPort>(
    line: &mut LineReader<P>,
    deadline: Deadline,
    capacity: usize,
) -> Result<Response> {
    let mut payload = Vec::new();
    let mut buf = [0u8; MAX_LINE];
    loop {
        let len = line.read_line(deadline, &mut buf)?;
        if len == 0 {
            debug!(collected = payload.len(), "response timed out");
            return Ok(Response {
                status: ResponseStatus::TimedOut,
                payload,
            });
        }
        let current = &buf[..len];
        if current == b"OK\r\n" {
            return Ok(Response {
                status: ResponseStatus::Success,
                payload,
            });
        }
        if current == b"ERROR\r\n" {
            return Ok(Response {
                status: ResponseStatus::ModemError,
                payload,
            });
        }
        let room = capacity.saturating_sub(payload.len());
        payload.extend_from_slice(&current[..len.min(room)]);
    }
}

/// Scan for an indicator line `"<prefix> <id>[,...]"` and extract the id.
pub fn await_session_id<P: ModemPort>(
    line: &mut LineReader<P>,
    deadline: Deadline,
    prefix: &str,
) -> Result<u8> {
    let mut buf = [0u8; MAX_LINE];
    loop {
        let len = line.read_line(deadline, &mut buf)?;
        if len == 0 {
            return Err(WireError::TimedOut);
        }
        let current = &buf[..len];
        if current.starts_with(b"ERROR") {
            return Err(WireError::CommandFailed);
        }
        if len > prefix.len() && current.starts_with(prefix.as_bytes()) {
            trace!(prefix, "indicator line matched");
            return parse_first_integer(&current[prefix.len()..])
                .ok_or_else(|| WireError::MalformedIndicator(lossy(current)));
        }
    }
}

/// Wait for the ready indicator `"<prefix> <id>,1"`.
pub fn await_ready<P: ModemPort>(
    line: &mut LineReader<P>,
    deadline: Deadline,
    prefix: &str,
    id: u8,
) -> Result<()> {
    let expected = format!("{prefix} {id},1");
    let mut buf = [0u8; MAX_LINE];
    loop {
        let len = line.read_line(deadline, &mut buf)?;
        if len == 0 {
            return Err(WireError::TimedOut);
        }
        let current = &buf[..len];
        if current.starts_with(b"ERROR") {
            return Err(WireError::CommandFailed);
        }
        if current.starts_with(expected.as_bytes()) {
            return Ok(());
        }
    }
}

/// Wait for the data-mode prompt: `CONNECT` accepts, `NO CARRIER` refuses.
pub fn await_connect<P: ModemPort>(line: &mut LineReader<P>, deadline: Deadline) -> Result<()> {
    let mut buf = [0u8; MAX_LINE];
    loop {
        let len = line.read_line(deadline, &mut buf)?;
        if len == 0 {
            return Err(WireError::TimedOut);
        }
        let current = &buf[..len];
        if current.starts_with(b"CONNECT\r") {
            return Ok(());
        }
        if current.starts_with(b"NO CARRIER\r") {
            return Err(WireError::NoCarrier);
        }
    }
}

fn parse_first_integer(bytes: &[u8]) -> Option<u8> {
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let digits: Vec<u8> = bytes[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .copied()
        .collect();
    std::str::from_utf8(&digits).ok()?.parse().ok()
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}
