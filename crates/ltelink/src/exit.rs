use std::fmt;

use ltelink_engine::EngineError;
use ltelink_transport::TransportError;
use ltelink_wire::WireError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
/// The server answered with an HTTP error status.
pub const HTTP_ERROR: i32 = 22;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
#[allow(dead_code)]
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::UnsupportedBaud(_) => USAGE,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Engine failures keep their numeric code in the message, preserving the
/// positive-code half of the sign contract for scripts that parse stderr.
pub fn engine_error(context: &str, err: EngineError) -> CliError {
    let code = match &err {
        EngineError::InvalidParameter(_)
        | EngineError::PayloadTooLarge { .. }
        | EngineError::DatagramTooLarge { .. } => USAGE,
        EngineError::Wire(WireError::TimedOut) => TIMEOUT,
        EngineError::Transport(_) => TRANSPORT_ERROR,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err} (code {})", err.code()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_map_to_the_timeout_exit_code() {
        let err = engine_error("x", EngineError::Wire(WireError::TimedOut));
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.contains("code 901"));
    }

    #[test]
    fn parameter_errors_map_to_usage() {
        let err = engine_error("x", EngineError::InvalidParameter("bad".to_string()));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn unsupported_baud_is_a_usage_error() {
        let err = transport_error("x", TransportError::UnsupportedBaud(1234));
        assert_eq!(err.code, USAGE);
    }
}
