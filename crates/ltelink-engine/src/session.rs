use std::fmt;

use ltelink_transport::{Deadline, ModemPort};
use ltelink_wire::{await_ready, await_session_id};
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::{EngineError, Result};

/// Modem-resident session handle, `1..=MAX_SESSIONS`.
pub type SessionId = u8;

/// Size of the firmware's global session pool.
pub const MAX_SESSIONS: SessionId = 5;

/// The three session kinds the firmware multiplexes. At most one of each
/// may be open at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Tcp,
    Udp,
    Http,
}

impl SessionKind {
    /// Indicator prefix announcing a newly configured session id.
    pub(crate) fn configured_prefix(self) -> &'static str {
        match self {
            SessionKind::Tcp => "+KTCPCFG:",
            SessionKind::Udp => "+KUDPCFG:",
            SessionKind::Http => "+KHTTPCFG:",
        }
    }

    /// Indicator prefix announcing session readiness.
    pub(crate) fn ready_prefix(self) -> &'static str {
        match self {
            SessionKind::Tcp => "+KTCP_IND:",
            SessionKind::Udp => "+KUDP_IND:",
            SessionKind::Http => "+KHTTP_IND:",
        }
    }

    pub(crate) fn close_verb(self) -> &'static str {
        match self {
            SessionKind::Tcp => "AT+KTCPCLOSE",
            SessionKind::Udp => "AT+KUDPCLOSE",
            SessionKind::Http => "AT+KHTTPCLOSE",
        }
    }

    pub(crate) fn delete_verb(self) -> &'static str {
        match self {
            SessionKind::Tcp => "AT+KTCPDEL",
            SessionKind::Udp => "AT+KUDPDEL",
            SessionKind::Http => "AT+KHTTPDEL",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionKind::Tcp => "tcp",
            SessionKind::Udp => "udp",
            SessionKind::Http => "http",
        })
    }
}

impl<P: ModemPort> Engine<P> {
    /// Fire a create-context command and record the session id the modem
    /// hands out.
    pub(crate) fn configure_session(
        &mut self,
        kind: SessionKind,
        command: &str,
    ) -> Result<SessionId> {
        self.send_line(command)?;
        let deadline = Deadline::after(self.config.timeouts.local);
        let id = await_session_id(&mut self.line, deadline, kind.configured_prefix())
            .map_err(|err| EngineError::demote(err, EngineError::ConfigureFailed(kind)))?;
        if id == 0 || id > MAX_SESSIONS {
            return Err(EngineError::ConfigureFailed(kind));
        }
        *self.slot_mut(kind) = Some(id);
        debug!(%kind, id, "session configured");
        Ok(id)
    }

    /// Wait for the kind's ready indicator within `timeout`.
    pub(crate) fn await_session_ready(
        &mut self,
        kind: SessionKind,
        id: SessionId,
        timeout: std::time::Duration,
    ) -> Result<()> {
        let deadline = Deadline::after(timeout);
        await_ready(&mut self.line, deadline, kind.ready_prefix(), id)
            .map_err(|err| EngineError::demote(err, EngineError::NotReady(kind)))?;
        info!(%kind, id, "session ready");
        Ok(())
    }

    /// Best-effort close + delete, freeing the firmware-side slot.
    ///
    /// Runs on every exit path of a session-using operation; results are
    /// discarded so a cleanup hiccup can never mask the primary failure.
    /// Skipping this after a failed setup leaks session slots until the
    /// modem is power-cycled.
    pub(crate) fn wind_up_session(&mut self, kind: SessionKind) {
        let Some(id) = self.slot_mut(kind).take() else {
            return;
        };
        let settle = self.config.timeouts.settle;
        for verb in [kind.close_verb(), kind.delete_verb()] {
            let command = format!("{verb}={id}");
            if let Err(err) = self.send_line(&command) {
                warn!(%kind, id, %err, "session cleanup write failed");
                return;
            }
            let _ = self.line.drain(settle);
        }
        debug!(%kind, id, "session wound up");
    }
}
