//! Cellular modem engine: session lifecycle, TCP/UDP transfer, and an HTTP
//! pipeline on top of the line-oriented command channel.
//!
//! The [`Engine`] owns the serial port and the per-kind session table. All
//! operations are synchronous and deadline-bounded; there is no background
//! task and no cancellation other than deadline expiry. Construct one with
//! a real [`TtyPort`](ltelink_transport::TtyPort) or any fake implementing
//! [`ModemPort`](ltelink_transport::ModemPort).

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod session;
pub mod tcp;
pub mod udp;
pub mod url;

pub use config::{ChunkPolicy, EngineConfig, FramingMode, Limits, Timeouts};
pub use engine::{Engine, NetworkTime};
pub use error::{EngineError, Result};
pub use http::HttpResponse;
pub use session::{SessionId, SessionKind, MAX_SESSIONS};
pub use tcp::{TcpState, TcpStatus};
pub use url::SplitUrl;
