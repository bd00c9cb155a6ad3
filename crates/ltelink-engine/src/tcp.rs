use ltelink_transport::{Deadline, ModemPort};
use ltelink_wire::send_framed;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::session::{SessionId, SessionKind};

/// Raw states in which the firmware still honors a receive command. The
/// teardown states keep delivering already-buffered data.
const USABLE_RAW_STATES: [u8; 4] = [0, 3, 4, 5];

/// Connection state of the modem-resident TCP socket.
///
/// Driven entirely by polling the status query; the firmware pushes no
/// notifications for this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TcpState {
    NotDefined,
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Closed,
    Unknown,
}

impl TcpState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => TcpState::NotDefined,
            1 => TcpState::Disconnected,
            2 => TcpState::Connecting,
            3 => TcpState::Connected,
            4 => TcpState::Closing,
            5 => TcpState::Closed,
            _ => TcpState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TcpState::NotDefined => "not-defined",
            TcpState::Disconnected => "disconnected",
            TcpState::Connecting => "connecting",
            TcpState::Connected => "connected",
            TcpState::Closing => "closing",
            TcpState::Closed => "closed",
            TcpState::Unknown => "unknown",
        }
    }
}

/// Snapshot from the socket status query.
#[derive(Clone, Copy, Debug)]
pub struct TcpStatus {
    pub state: TcpState,
    /// Firmware notification code, -1 when the socket is healthy.
    pub notif: i32,
    /// Bytes queued on the modem, waiting to be sent.
    pub pending: usize,
    /// Bytes received and buffered, readable with [`tcp_read`](Engine::tcp_read).
    pub buffered: usize,
}

struct RawTcpStat {
    status: u8,
    notif: i32,
    pending: usize,
    buffered: usize,
}

impl<P: ModemPort> Engine<P> {
    /// Open the single TCP session toward `host:port`.
    ///
    /// On any failure after the session id was allocated, the session is
    /// wound up (close + delete) before the error surfaces, so the
    /// firmware-side slot stays free for the next attempt.
    pub fn tcp_connect(&mut self, host: &str, port: u16) -> Result<()> {
        let max = self.config.limits.max_host;
        if host.is_empty() || host.len() > max {
            return Err(EngineError::InvalidParameter(format!(
                "host must be 1..={max} bytes"
            )));
        }
        if self.slot(SessionKind::Tcp).is_some() {
            return Err(EngineError::SessionBusy(SessionKind::Tcp));
        }

        let command = format!("AT+KTCPCFG=1,0,\"{host}\",{port}");
        let id = self.configure_session(SessionKind::Tcp, &command)?;

        self.send_line(&format!("AT+KTCPCNX={id}"))?;
        if let Err(err) = self.await_session_ready(SessionKind::Tcp, id, self.config.timeouts.tcp_connect)
        {
            self.wind_up_session(SessionKind::Tcp);
            return Err(err);
        }
        info!(host, port, id, "tcp connected");
        Ok(())
    }

    /// Close and delete the TCP session.
    ///
    /// The close result is advisory; the delete is issued and the local
    /// slot cleared regardless.
    pub fn tcp_disconnect(&mut self) -> Result<()> {
        let id = self
            .slot(SessionKind::Tcp)
            .ok_or(EngineError::NoSession(SessionKind::Tcp))?;
        let local = self.config.timeouts.local;

        if let Err(err) = self.command(&format!("AT+KTCPCLOSE={id}"), local) {
            debug!(id, %err, "tcp close reported failure");
        }
        let outcome = self
            .command(&format!("AT+KTCPDEL={id}"), local)
            .map(|_| ())
            .map_err(|err| err.demote_to(EngineError::TcpDelete));
        *self.slot_mut(SessionKind::Tcp) = None;
        info!(id, "tcp disconnected");
        outcome
    }

    /// Read buffered bytes into `buf`, returning how many were stored.
    ///
    /// Polls the socket status first: an empty socket returns `Ok(0)`
    /// instead of issuing a receive that would block until its deadline.
    pub fn tcp_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let max = self.config.limits.max_tcp_read;
        if buf.is_empty() || buf.len() > max {
            return Err(EngineError::InvalidParameter(format!(
                "read size must be 1..={max} bytes"
            )));
        }
        let id = self
            .slot(SessionKind::Tcp)
            .ok_or(EngineError::NoSession(SessionKind::Tcp))?;

        let stat = self.ktcpstat(id)?;
        if !USABLE_RAW_STATES.contains(&stat.status) {
            return Err(EngineError::TcpUnusable(stat.status));
        }
        if stat.buffered == 0 {
            return Ok(0);
        }

        let request = buf.len().min(stat.buffered);
        let command = format!("AT+KTCPRCV={id},{request}");
        self.enter_data_mode(&command, self.config.timeouts.tcp_write, EngineError::TcpRead)?;

        let deadline = Deadline::after(self.config.timeouts.tcp_write);
        let (line, config) = (&mut self.line, &self.config);
        let data = ltelink_wire::receive_framed(
            line,
            deadline,
            Some(request),
            request,
            config.sentinel.as_bytes(),
        )
        .map_err(|err| EngineError::demote(err, EngineError::TcpRead))?;
        let data = self.unframe_payload(data)?;
        buf[..data.len()].copy_from_slice(&data);
        debug!(id, bytes = data.len(), "tcp read");
        Ok(data.len())
    }

    /// Send `data` on the TCP session in one announced write.
    ///
    /// Returns the number of payload bytes accepted by the modem; the
    /// configured framing mode decides how they appear on the wire.
    pub fn tcp_write(&mut self, data: &[u8]) -> Result<usize> {
        let max = self.config.limits.max_tcp_write;
        if data.is_empty() {
            return Err(EngineError::InvalidParameter(
                "write payload is empty".to_string(),
            ));
        }
        if data.len() > max {
            return Err(EngineError::PayloadTooLarge {
                size: data.len(),
                max,
            });
        }
        let id = self
            .slot(SessionKind::Tcp)
            .ok_or(EngineError::NoSession(SessionKind::Tcp))?;

        let wire = self.frame_payload(data).into_owned();
        let command = format!("AT+KTCPSND={id},{}", wire.len());
        self.enter_data_mode(&command, self.config.timeouts.tcp_write, EngineError::TcpWrite)?;

        let (line, config) = (&mut self.line, &self.config);
        send_framed(line.get_mut(), &wire, config.sentinel.as_bytes())
            .map_err(|err| EngineError::demote(err, EngineError::TcpWrite))?;
        self.command_tail(self.config.timeouts.tcp_write)
            .map_err(|err| err.demote_to(EngineError::TcpWrite))?;
        debug!(id, bytes = data.len(), "tcp write acknowledged");
        Ok(data.len())
    }

    /// Announce a burst write of `size` raw bytes.
    ///
    /// After this returns, stream exactly `size` bytes through
    /// [`port_mut`](Engine::port_mut) without long gaps, then call
    /// [`tcp_finish_burst`](Engine::tcp_finish_burst).
    pub fn tcp_write_burst(&mut self, size: usize) -> Result<()> {
        let max = self.config.limits.max_tcp_burst;
        if size == 0 || size > max {
            return Err(EngineError::InvalidParameter(format!(
                "burst size must be 1..={max} bytes"
            )));
        }
        let id = self
            .slot(SessionKind::Tcp)
            .ok_or(EngineError::NoSession(SessionKind::Tcp))?;
        let command = format!("AT+KTCPSND={id},{size}");
        self.enter_data_mode(&command, self.config.timeouts.tcp_write, EngineError::TcpWrite)
    }

    /// Terminate a burst write and collect the modem's acknowledgement.
    pub fn tcp_finish_burst(&mut self) -> Result<()> {
        self.slot(SessionKind::Tcp)
            .ok_or(EngineError::NoSession(SessionKind::Tcp))?;
        let (line, config) = (&mut self.line, &self.config);
        let port = line.get_mut();
        port.write_all(config.sentinel.as_bytes())?;
        port.flush()?;
        self.command_tail(self.config.timeouts.tcp_write)
            .map_err(|err| err.demote_to(EngineError::TcpWrite))?;
        Ok(())
    }

    /// Current socket status snapshot.
    pub fn tcp_status(&mut self) -> Result<TcpStatus> {
        let id = self
            .slot(SessionKind::Tcp)
            .ok_or(EngineError::NoSession(SessionKind::Tcp))?;
        let raw = self.ktcpstat(id)?;
        Ok(TcpStatus {
            state: TcpState::from_raw(raw.status),
            notif: raw.notif,
            pending: raw.pending,
            buffered: raw.buffered,
        })
    }

    fn ktcpstat(&mut self, id: SessionId) -> Result<RawTcpStat> {
        let payload = self
            .command(&format!("AT+KTCPSTAT={id}"), self.config.timeouts.local)
            .map_err(|err| err.demote_to(EngineError::TcpStatus))?;
        parse_ktcpstat(&payload).ok_or(EngineError::TcpStatus)
    }
}

fn parse_ktcpstat(payload: &[u8]) -> Option<RawTcpStat> {
    let text = String::from_utf8_lossy(payload);
    let rest = &text[text.find("+KTCPSTAT:")? + "+KTCPSTAT:".len()..];
    let fields_line = rest.split(['\r', '\n']).next()?;
    let mut fields = fields_line.trim().split(',');
    Some(RawTcpStat {
        status: fields.next()?.trim().parse().ok()?,
        notif: fields.next()?.trim().parse().ok()?,
        pending: fields.next()?.trim().parse().ok()?,
        buffered: fields.next()?.trim().parse().ok()?,
    })
}
