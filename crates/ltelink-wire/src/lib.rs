//! Line reading, response classification, and data framing for the modem's
//! command/response channel.
//!
//! This is the synchronization core of ltelink. Every command the engine
//! fires funnels through [`await_response`], and every data-mode payload
//! crosses the wire through the framer, either terminated by the registered
//! end-of-data sentinel or escaped byte-by-byte with the [`escape`] codec.

pub mod error;
pub mod escape;
pub mod framer;
pub mod line;
pub mod response;

pub use error::{Result, WireError};
pub use framer::{receive_framed, send_framed, send_framed_paced};
pub use line::{LineReader, MAX_LINE};
pub use response::{
    await_connect, await_ready, await_response, await_session_id, Response, ResponseStatus,
};
