use ltelink_transport::ModemPort;
use ltelink_wire::send_framed;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::session::SessionKind;

impl<P: ModemPort> Engine<P> {
    /// Prepare the single UDP session.
    pub fn udp_open(&mut self) -> Result<()> {
        if self.slot(SessionKind::Udp).is_some() {
            return Err(EngineError::SessionBusy(SessionKind::Udp));
        }
        let id = self.configure_session(SessionKind::Udp, "AT+KUDPCFG=1,0")?;
        if let Err(err) = self.await_session_ready(SessionKind::Udp, id, self.config.timeouts.local)
        {
            self.wind_up_session(SessionKind::Udp);
            return Err(err);
        }
        info!(id, "udp session open");
        Ok(())
    }

    /// Close and delete the UDP session.
    pub fn udp_close(&mut self) -> Result<()> {
        if self.slot(SessionKind::Udp).is_none() {
            return Err(EngineError::NoSession(SessionKind::Udp));
        }
        self.wind_up_session(SessionKind::Udp);
        Ok(())
    }

    /// One-shot datagram send with the destination embedded in the command.
    ///
    /// An `OK` only confirms the modem accepted the datagram; there is no
    /// delivery confirmation, and silent loss is normal for UDP.
    pub fn udp_send(&mut self, host: &str, port: u16, datagram: &[u8]) -> Result<()> {
        let id = self
            .slot(SessionKind::Udp)
            .ok_or(EngineError::NoSession(SessionKind::Udp))?;
        let max_host = self.config.limits.max_host;
        if host.is_empty() || host.len() > max_host {
            return Err(EngineError::InvalidParameter(format!(
                "host must be 1..={max_host} bytes"
            )));
        }
        let max = self.config.limits.max_udp_payload;
        if datagram.len() > max {
            return Err(EngineError::DatagramTooLarge {
                size: datagram.len(),
                max,
            });
        }

        let wire = self.frame_payload(datagram).into_owned();
        let command = format!("AT+KUDPSND={id},\"{host}\",{port},{}", wire.len());
        self.enter_data_mode(&command, self.config.timeouts.udp, EngineError::UdpRefused)?;

        let (line, config) = (&mut self.line, &self.config);
        send_framed(line.get_mut(), &wire, config.sentinel.as_bytes())
            .map_err(|err| EngineError::demote(err, EngineError::UdpRefused))?;
        self.command_tail(self.config.timeouts.udp)
            .map_err(|err| err.demote_to(EngineError::UdpUnacknowledged))?;
        debug!(id, host, port, bytes = datagram.len(), "udp datagram accepted");
        Ok(())
    }
}
