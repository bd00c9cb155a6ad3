use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use ltelink_transport::{Deadline, ModemPort};
use ltelink_wire::{await_connect, await_response, escape, LineReader, ResponseStatus};
use tracing::{debug, info};

use crate::config::{EngineConfig, FramingMode};
use crate::error::{EngineError, Result};
use crate::session::{SessionId, SessionKind};

/// Attach is the one documented-flaky step; everything else is the
/// caller's retry problem.
const ATTACH_RETRIES: usize = 5;

/// The modem engine.
///
/// Owns the serial port and the per-kind session table. All session state
/// is volatile and modem-resident: nothing is persisted, and a fresh
/// engine rebuilds everything through [`init`](Engine::init). One in-flight
/// exchange at a time: `&mut self` methods serialize transport access at
/// the public boundary, so no lock is needed for single-threaded callers.
pub struct Engine<P> {
    pub(crate) line: LineReader<P>,
    pub(crate) config: EngineConfig,
    initialized: bool,
    tcp: Option<SessionId>,
    udp: Option<SessionId>,
    http: Option<SessionId>,
}

/// Date and time reported by the network, 24-hour clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl fmt::Display for NetworkTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}/{:02}/{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hours, self.minutes, self.seconds
        )
    }
}

impl<P: ModemPort> Engine<P> {
    pub fn new(port: P, config: EngineConfig) -> Self {
        Self {
            line: LineReader::new(port),
            config,
            initialized: false,
            tcp: None,
            udp: None,
            http: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Direct access to the underlying port, for burst writes.
    pub fn port_mut(&mut self) -> &mut P {
        self.line.get_mut()
    }

    /// Consume the engine and return the port.
    pub fn into_port(self) -> P {
        self.line.into_inner()
    }

    /// Run the init command sequence and register the end-of-data pattern.
    ///
    /// The first command after modem boot routinely gets lost, so the
    /// sequence opens with a harmless `ATZ` and discards every reply
    /// instead of awaiting it.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Err(EngineError::AlreadyInitialized);
        }
        let settle = self.config.timeouts.settle;
        let pattern = format!("AT+KPATTERN=\"{}\"", self.config.sentinel);
        for command in ["ATZ", "ATE1", "AT+KSLEEP=2", pattern.as_str()] {
            self.send_line(command)?;
            self.line.drain(settle)?;
        }
        self.tcp = None;
        self.udp = None;
        self.http = None;
        self.initialized = true;
        info!("modem initialized");
        Ok(())
    }

    /// Flush the port and mark the engine uninitialized.
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        self.line.get_mut().flush()?;
        self.initialized = false;
        Ok(())
    }

    /// Point the connection profile at `apn` and attach to the network.
    ///
    /// The attach command is retried up to [`ATTACH_RETRIES`] times; it is
    /// the only retry inside the engine.
    pub fn attach(&mut self, apn: &str, user: &str, password: &str) -> Result<()> {
        let local = self.config.timeouts.local;
        let profile = format!("AT+KCNXCFG=1,\"GPRS\",\"{apn}\",\"{user}\",\"{password}\"");
        self.command(&profile, local)
            .map_err(|err| err.demote_to(EngineError::ProfileRejected))?;
        self.command("AT+KCNXPROFILE=1", local)
            .map_err(|err| err.demote_to(EngineError::ProfileRejected))?;

        let attach = self.config.timeouts.attach;
        let mut outcome = Err(EngineError::AttachFailed);
        for attempt in 1..=ATTACH_RETRIES {
            match self.command("AT+CGATT=1", attach) {
                Ok(_) => {
                    info!(attempt, "attached to network");
                    return Ok(());
                }
                Err(err) => {
                    debug!(attempt, %err, "attach attempt failed");
                    outcome = Err(err.demote_to(EngineError::AttachFailed));
                }
            }
        }
        outcome
    }

    /// The module's IMEI.
    pub fn imei(&mut self) -> Result<String> {
        let payload = self
            .command("AT+CGSN", self.config.timeouts.local)
            .map_err(|err| err.demote_to(EngineError::ImeiUnavailable))?;
        parse_imei(&payload).ok_or(EngineError::ImeiUnavailable)
    }

    /// Current date and time as reported by the network.
    pub fn network_clock(&mut self) -> Result<NetworkTime> {
        let payload = self
            .command("AT+CCLK?", self.config.timeouts.local)
            .map_err(|err| err.demote_to(EngineError::ClockUnavailable))?;
        let time = parse_cclk(&payload).ok_or(EngineError::ClockUnavailable)?;
        // Year 00 means the clock was never set, i.e. no network yet.
        if time.year == 2000 {
            return Err(EngineError::ClockNotValid);
        }
        Ok(time)
    }

    /// Received signal strength in dBm.
    pub fn rssi(&mut self) -> Result<i32> {
        let payload = self
            .command("AT+CSQ", self.config.timeouts.local)
            .map_err(|err| err.demote_to(EngineError::SignalUnknown))?;
        let quality = parse_csq(&payload).ok_or(EngineError::SignalUnknown)?;
        if quality == 99 {
            return Err(EngineError::SignalUnknown);
        }
        Ok(2 * i32::from(quality) - 113)
    }

    /// Whether the module is attached to the packet service.
    pub fn service_attached(&mut self) -> Result<bool> {
        // A SIM-less modem answers ERROR here; report detached rather than
        // failing the query.
        match self.command("AT+CGATT?", self.config.timeouts.attach) {
            Ok(payload) => Ok(parse_cgatt(&payload).unwrap_or(false)),
            Err(EngineError::Wire(ltelink_wire::WireError::CommandFailed)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// The module's local IPv4 address on the active bearer.
    pub fn local_address(&mut self) -> Result<String> {
        let payload = self
            .command("AT+KCGPADDR=1", self.config.timeouts.local)
            .map_err(|err| err.demote_to(EngineError::AddressUnavailable))?;
        parse_kcgpaddr(&payload).ok_or(EngineError::AddressUnavailable)
    }

    /// Upload a root CA certificate for https sessions.
    pub fn store_root_ca(&mut self, pem: &str) -> Result<()> {
        let max = self.config.limits.max_root_ca;
        if pem.is_empty() || pem.len() > max {
            return Err(EngineError::InvalidParameter(format!(
                "root CA must be 1..={max} bytes"
            )));
        }
        let announce = format!("AT+KCERTSTORE=0,{}", pem.len());
        self.send_line(&announce)?;
        let deadline = Deadline::after(self.config.timeouts.local);
        await_connect(&mut self.line, deadline)
            .map_err(|err| EngineError::demote(err, EngineError::CertificateRejected))?;
        // The cert store reads exactly the announced byte count, no sentinel.
        let port = self.line.get_mut();
        port.write_all(pem.as_bytes())?;
        port.flush()?;
        std::thread::sleep(self.config.timeouts.data_mode_guard);
        self.command_tail(self.config.timeouts.local)
            .map_err(|err| err.demote_to(EngineError::CertificateRejected))?;
        info!(bytes = pem.len(), "root CA stored");
        Ok(())
    }

    /// Write one command line, CRLF-terminated.
    pub(crate) fn send_line(&mut self, command: &str) -> Result<()> {
        debug!(command, "→ modem");
        let port = self.line.get_mut();
        port.write_all(command.as_bytes())?;
        port.write_all(b"\r\n")?;
        port.flush()?;
        Ok(())
    }

    /// Fire one command and classify its response. `Ok(payload)` on `OK`;
    /// `ERROR` and silence surface as wire errors.
    pub(crate) fn command(&mut self, command: &str, timeout: Duration) -> Result<Vec<u8>> {
        self.send_line(command)?;
        self.command_tail(timeout)
    }

    /// The response half of [`command`](Engine::command), for callers that
    /// already streamed data after the command line.
    pub(crate) fn command_tail(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let capacity = self.config.limits.max_response;
        let deadline = Deadline::after(timeout);
        let response = await_response(&mut self.line, deadline, capacity)?;
        match response.status {
            ResponseStatus::Success => Ok(response.payload),
            ResponseStatus::ModemError => Err(ltelink_wire::WireError::CommandFailed.into()),
            ResponseStatus::TimedOut => Err(ltelink_wire::WireError::TimedOut.into()),
        }
    }

    /// Announce a data-mode command and wait for the CONNECT prompt.
    pub(crate) fn enter_data_mode(
        &mut self,
        command: &str,
        timeout: Duration,
        refusal: EngineError,
    ) -> Result<()> {
        self.send_line(command)?;
        std::thread::sleep(self.config.timeouts.data_mode_guard);
        let deadline = Deadline::after(timeout);
        await_connect(&mut self.line, deadline).map_err(|err| EngineError::demote(err, refusal))
    }

    /// A payload as it will appear on the wire under the configured
    /// framing mode.
    pub(crate) fn frame_payload<'a>(&self, payload: &'a [u8]) -> Cow<'a, [u8]> {
        match self.config.framing {
            FramingMode::Sentinel => Cow::Borrowed(payload),
            FramingMode::Escaped => {
                Cow::Owned(escape::encode(payload, self.config.sentinel.as_bytes()))
            }
        }
    }

    /// Undo [`frame_payload`](Engine::frame_payload) on received data.
    pub(crate) fn unframe_payload(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        match self.config.framing {
            FramingMode::Sentinel => Ok(data),
            FramingMode::Escaped => Ok(escape::decode(&data)?),
        }
    }

    pub(crate) fn slot(&self, kind: SessionKind) -> Option<SessionId> {
        match kind {
            SessionKind::Tcp => self.tcp,
            SessionKind::Udp => self.udp,
            SessionKind::Http => self.http,
        }
    }

    pub(crate) fn slot_mut(&mut self, kind: SessionKind) -> &mut Option<SessionId> {
        match kind {
            SessionKind::Tcp => &mut self.tcp,
            SessionKind::Udp => &mut self.udp,
            SessionKind::Http => &mut self.http,
        }
    }
}

fn parse_imei(payload: &[u8]) -> Option<String> {
    for group in payload.split(|b| !b.is_ascii_digit()) {
        if group.len() == 15 {
            return Some(String::from_utf8_lossy(group).into_owned());
        }
    }
    None
}

fn parse_cclk(payload: &[u8]) -> Option<NetworkTime> {
    let text = String::from_utf8_lossy(payload);
    let rest = &text[text.find("+CCLK:")? + "+CCLK:".len()..];
    let body = &rest[rest.find('"')? + 1..];
    let bytes = body.as_bytes();
    // yy/MM/dd,hh:mm:ss with optional timezone suffix.
    if bytes.len() < 17 {
        return None;
    }
    let sep_ok = bytes[2] == b'/' && bytes[5] == b'/' && bytes[8] == b',';
    let time_ok = bytes[11] == b':' && bytes[14] == b':';
    if !sep_ok || !time_ok {
        return None;
    }
    Some(NetworkTime {
        year: 2000 + u16::from(pair(bytes, 0)?),
        month: pair(bytes, 3)?,
        day: pair(bytes, 6)?,
        hours: pair(bytes, 9)?,
        minutes: pair(bytes, 12)?,
        seconds: pair(bytes, 15)?,
    })
}

fn pair(bytes: &[u8], at: usize) -> Option<u8> {
    let (hi, lo) = (bytes[at], bytes[at + 1]);
    if !hi.is_ascii_digit() || !lo.is_ascii_digit() {
        return None;
    }
    Some((hi - b'0') * 10 + (lo - b'0'))
}

fn parse_csq(payload: &[u8]) -> Option<u8> {
    let text = String::from_utf8_lossy(payload);
    let rest = &text[text.find("+CSQ:")? + "+CSQ:".len()..];
    let quality = rest.trim_start().split(',').next()?.trim();
    quality.parse().ok()
}

fn parse_cgatt(payload: &[u8]) -> Option<bool> {
    let text = String::from_utf8_lossy(payload);
    let rest = &text[text.find("+CGATT:")? + "+CGATT:".len()..];
    let digit = rest.trim_start().chars().next()?;
    Some(digit == '1')
}

fn parse_kcgpaddr(payload: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(payload);
    let rest = &text[text.find("+KCGPADDR:")? + "+KCGPADDR:".len()..];
    let open = rest.find('"')?;
    let rest = &rest[open + 1..];
    let close = rest.find('"')?;
    Some(rest[..close].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imei_is_the_fifteen_digit_run() {
        let payload = b"AT+CGSN\r\r\n354723090001234\r\n";
        assert_eq!(parse_imei(payload).as_deref(), Some("354723090001234"));
    }

    #[test]
    fn imei_ignores_shorter_digit_runs() {
        assert_eq!(parse_imei(b"+CSQ: 18,99\r\n"), None);
    }

    #[test]
    fn cclk_parses_quoted_timestamp() {
        let payload = b"+CCLK: \"24/07/15,08:30:59+36\"\r\n";
        let time = parse_cclk(payload).unwrap();
        assert_eq!(
            time,
            NetworkTime {
                year: 2024,
                month: 7,
                day: 15,
                hours: 8,
                minutes: 30,
                seconds: 59,
            }
        );
        assert_eq!(time.to_string(), "2024/07/15 08:30:59");
    }

    #[test]
    fn cclk_rejects_garbage() {
        assert!(parse_cclk(b"+CCLK: \"bogus\"\r\n").is_none());
        assert!(parse_cclk(b"no clock here\r\n").is_none());
    }

    #[test]
    fn csq_extracts_first_field() {
        assert_eq!(parse_csq(b"+CSQ: 18,99\r\n"), Some(18));
        assert_eq!(parse_csq(b"+CSQ: 99,99\r\n"), Some(99));
        assert_eq!(parse_csq(b"nope"), None);
    }

    #[test]
    fn cgatt_state_digit() {
        assert_eq!(parse_cgatt(b"+CGATT: 1\r\n"), Some(true));
        assert_eq!(parse_cgatt(b"+CGATT: 0\r\n"), Some(false));
        assert_eq!(parse_cgatt(b"ok then"), None);
    }

    #[test]
    fn kcgpaddr_extracts_quoted_address() {
        let payload = b"+KCGPADDR: 1,\"10.114.7.23\"\r\n";
        assert_eq!(parse_kcgpaddr(payload).as_deref(), Some("10.114.7.23"));
    }
}
