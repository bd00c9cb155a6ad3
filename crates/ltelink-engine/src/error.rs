use ltelink_transport::TransportError;
use ltelink_wire::WireError;

use crate::session::SessionKind;

/// Errors surfaced by engine operations.
///
/// HTTP 4xx/5xx statuses are NOT errors; they come back as data inside
/// [`HttpResponse`](crate::HttpResponse) with a negated
/// [`return_code`](crate::HttpResponse::return_code). Everything here maps
/// to a positive numeric [`code`](EngineError::code), so callers can tell
/// engine failures from application-level refusals by sign alone.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Rejected before any transport I/O.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The payload exceeds the configured write limit.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The datagram exceeds the configured UDP limit.
    #[error("datagram too large ({size} bytes, max {max})")]
    DatagramTooLarge { size: usize, max: usize },

    /// `init` was called twice.
    #[error("engine already initialized")]
    AlreadyInitialized,

    /// The operation requires a prior `init`.
    #[error("engine not initialized")]
    NotInitialized,

    /// The operation requires an open session of this kind.
    #[error("no {0} session is open")]
    NoSession(SessionKind),

    /// At most one session per kind may be open.
    #[error("a {0} session is already open")]
    SessionBusy(SessionKind),

    /// The modem did not hand out a session id.
    #[error("failed to allocate a {0} session")]
    ConfigureFailed(SessionKind),

    /// The ready indicator never arrived.
    #[error("{0} session never became ready")]
    NotReady(SessionKind),

    /// The connection profile was rejected.
    #[error("connection profile rejected")]
    ProfileRejected,

    /// The modem could not attach to the network within the retry budget.
    #[error("could not attach to the network")]
    AttachFailed,

    #[error("IMEI unavailable")]
    ImeiUnavailable,

    #[error("network clock unavailable")]
    ClockUnavailable,

    /// The network clock reads as unset (usually: not attached yet).
    #[error("network clock not set yet")]
    ClockNotValid,

    /// Signal quality reported as unmeasurable.
    #[error("signal strength unmeasurable")]
    SignalUnknown,

    #[error("local address unavailable")]
    AddressUnavailable,

    /// The certificate store refused the root CA.
    #[error("root CA rejected by the modem")]
    CertificateRejected,

    /// The header-phase data mode was refused.
    #[error("http header connection refused")]
    HttpConnect,

    /// Streaming the request header failed.
    #[error("http header phase failed")]
    HttpHeader,

    /// The GET/POST verb was refused.
    #[error("http request refused")]
    HttpRequest,

    /// The response status line or header block was malformed.
    #[error("malformed http response header")]
    HttpResponseHeader,

    /// The response body could not be retrieved.
    #[error("http response body failed")]
    HttpResponseBody,

    /// The status query failed or returned garbage.
    #[error("tcp status query failed")]
    TcpStatus,

    /// The socket is in a state that does not allow a receive.
    #[error("tcp socket unusable (raw state {0})")]
    TcpUnusable(u8),

    #[error("tcp receive failed")]
    TcpRead,

    #[error("tcp send failed")]
    TcpWrite,

    /// Close went through but the session delete was refused.
    #[error("tcp session delete failed")]
    TcpDelete,

    /// The UDP send command was refused before data mode.
    #[error("udp send refused")]
    UdpRefused,

    /// The modem never acknowledged accepting the datagram.
    #[error("udp send unacknowledged")]
    UdpUnacknowledged,

    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Collapse a protocol-level wire refusal into `fallback`.
    ///
    /// Timeouts, transport faults, and payload/escape violations keep their
    /// identity: they mean something different to the caller than "the
    /// modem said no".
    pub(crate) fn demote(err: WireError, fallback: EngineError) -> EngineError {
        match err {
            WireError::TimedOut
            | WireError::Transport(_)
            | WireError::SentinelInPayload { .. }
            | WireError::MalformedEscape { .. } => EngineError::Wire(err),
            _ => fallback,
        }
    }

    /// [`demote`](Self::demote) applied to an already-wrapped error.
    pub(crate) fn demote_to(self, fallback: EngineError) -> EngineError {
        match self {
            EngineError::Wire(err) => EngineError::demote(err, fallback),
            other => other,
        }
    }

    /// Numeric error code for the caller-visible contract.
    ///
    /// Always positive; HTTP application failures are reported separately
    /// as negated status codes, so the sign disambiguates.
    pub fn code(&self) -> u16 {
        match self {
            EngineError::InvalidParameter(_) | EngineError::PayloadTooLarge { .. } => 900,
            EngineError::DatagramTooLarge { .. } => 802,
            EngineError::AlreadyInitialized => 100,
            EngineError::NotInitialized => 101,
            EngineError::NoSession(SessionKind::Tcp) => 602,
            EngineError::NoSession(_) => 101,
            EngineError::SessionBusy(SessionKind::Tcp) => 601,
            EngineError::SessionBusy(_) => 100,
            EngineError::ConfigureFailed(SessionKind::Tcp) => 603,
            EngineError::ConfigureFailed(SessionKind::Udp) => 801,
            EngineError::ConfigureFailed(SessionKind::Http) => 701,
            EngineError::NotReady(SessionKind::Tcp) => 637,
            EngineError::NotReady(SessionKind::Udp) => 801,
            EngineError::NotReady(SessionKind::Http) => 702,
            EngineError::ProfileRejected => 125,
            EngineError::AttachFailed => 199,
            EngineError::ImeiUnavailable => 143,
            EngineError::ClockUnavailable => 122,
            EngineError::ClockNotValid => 104,
            EngineError::SignalUnknown => 102,
            EngineError::AddressUnavailable => 651,
            EngineError::CertificateRejected => 705,
            EngineError::HttpConnect => 703,
            EngineError::HttpHeader => 704,
            EngineError::HttpRequest => 712,
            EngineError::HttpResponseHeader => 710,
            EngineError::HttpResponseBody => 711,
            EngineError::TcpStatus => 641,
            EngineError::TcpUnusable(_) => 620,
            EngineError::TcpRead => 638,
            EngineError::TcpWrite => 639,
            EngineError::TcpDelete => 604,
            EngineError::UdpRefused => 803,
            EngineError::UdpUnacknowledged => 804,
            EngineError::Wire(WireError::TimedOut) => 901,
            EngineError::Wire(WireError::CommandFailed) => 902,
            EngineError::Wire(WireError::NoCarrier) => 103,
            EngineError::Wire(WireError::SentinelInPayload { .. }) => 900,
            EngineError::Wire(_) => 999,
            EngineError::Transport(_) => 999,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_keep_their_code() {
        assert_eq!(EngineError::Wire(WireError::TimedOut).code(), 901);
    }

    #[test]
    fn parameter_errors_share_the_900_family() {
        assert_eq!(
            EngineError::InvalidParameter("x".to_string()).code(),
            900
        );
        assert_eq!(
            EngineError::Wire(WireError::SentinelInPayload { offset: 0 }).code(),
            900
        );
    }

    #[test]
    fn demote_collapses_refusals_but_not_timeouts() {
        let demoted = EngineError::demote(WireError::CommandFailed, EngineError::HttpHeader);
        assert!(matches!(demoted, EngineError::HttpHeader));

        let kept = EngineError::demote(WireError::TimedOut, EngineError::HttpHeader);
        assert!(matches!(kept, EngineError::Wire(WireError::TimedOut)));
    }

    #[test]
    fn session_codes_are_kind_specific() {
        assert_eq!(EngineError::ConfigureFailed(SessionKind::Http).code(), 701);
        assert_eq!(EngineError::ConfigureFailed(SessionKind::Tcp).code(), 603);
        assert_eq!(EngineError::NotReady(SessionKind::Http).code(), 702);
    }
}
