//! Serial byte-channel abstraction for cellular modem control.
//!
//! Provides the raw transport the rest of ltelink builds on:
//! - [`ModemPort`] — a poll-style bidirectional byte channel
//! - [`TtyPort`] — a raw-mode serial device implementation (Unix)
//! - [`Deadline`] — the single home for `now + timeout` arithmetic
//!
//! This is the lowest layer of ltelink. Everything above it busy-polls the
//! port against an explicit deadline; there is no async I/O anywhere.

pub mod clock;
pub mod error;
pub mod port;

#[cfg(unix)]
pub mod tty;

pub use clock::{Deadline, POLL_INTERVAL};
pub use error::{Result, TransportError};
pub use port::ModemPort;

#[cfg(unix)]
pub use tty::TtyPort;
