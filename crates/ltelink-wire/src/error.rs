use ltelink_transport::TransportError;

/// Errors that can occur on the modem's command/response wire.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A wait exceeded its deadline without a terminal line.
    #[error("timed out waiting for the modem")]
    TimedOut,

    /// The modem answered `ERROR`.
    #[error("modem answered ERROR")]
    CommandFailed,

    /// The modem refused to enter data mode.
    #[error("modem refused data mode (NO CARRIER)")]
    NoCarrier,

    /// An indicator line carried no numeric session id.
    #[error("indicator line carried no session id: {0:?}")]
    MalformedIndicator(String),

    /// The payload contains the end-of-data sentinel and cannot be framed.
    #[error("payload contains the end-of-data sentinel at offset {offset}")]
    SentinelInPayload { offset: usize },

    /// An escape sequence could not be decoded.
    #[error("malformed escape sequence at offset {offset}")]
    MalformedEscape { offset: usize },
}

pub type Result<T> = std::result::Result<T, WireError>;
