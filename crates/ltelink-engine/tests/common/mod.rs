//! Scripted modem double shared by the integration tests.

// Each test target compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use ltelink_engine::{ChunkPolicy, EngineConfig, Timeouts};
use ltelink_transport::ModemPort;

/// One expected exchange in a modem script.
pub enum Step {
    /// Fire `reply` once the exact command line has been written.
    Command(String, Vec<u8>),
    /// Fire `reply` once a data payload terminated by the sentinel has
    /// been written.
    Data(Vec<u8>),
}

pub fn cmd(expect: &str, reply: &[u8]) -> Step {
    Step::Command(expect.to_string(), reply.to_vec())
}

pub fn data(reply: &[u8]) -> Step {
    Step::Data(reply.to_vec())
}

/// A modem that follows a fixed script: each written command (or framed
/// payload) consumes the next step and queues its reply for reading.
/// Unscripted writes are ignored, which is how drains and cleanup verbs
/// pass through without bookkeeping.
pub struct FakeModem {
    steps: VecDeque<Step>,
    rx: VecDeque<u8>,
    window: Vec<u8>,
    pub sent: Vec<u8>,
    sentinel: Vec<u8>,
}

impl FakeModem {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            rx: VecDeque::new(),
            window: Vec::new(),
            sent: Vec::new(),
            sentinel: b"@EOD@".to_vec(),
        }
    }

    pub fn sent_text(&self) -> String {
        String::from_utf8_lossy(&self.sent).into_owned()
    }

    pub fn remaining_steps(&self) -> usize {
        self.steps.len()
    }

    fn advance(&mut self) {
        loop {
            let matched = match self.steps.front() {
                Some(Step::Command(expect, _)) => {
                    let needle = format!("{expect}\r\n");
                    match find(&self.window, needle.as_bytes()) {
                        Some(at) => Some(at + needle.len()),
                        None => None,
                    }
                }
                Some(Step::Data(_)) => {
                    find(&self.window, &self.sentinel).map(|at| at + self.sentinel.len())
                }
                None => None,
            };
            let Some(consumed) = matched else {
                return;
            };
            self.window.drain(..consumed);
            let reply = match self.steps.pop_front() {
                Some(Step::Command(_, reply)) | Some(Step::Data(reply)) => reply,
                None => unreachable!(),
            };
            self.rx.extend(reply);
        }
    }
}

impl ModemPort for FakeModem {
    fn read_byte(&mut self) -> ltelink_transport::Result<Option<u8>> {
        Ok(self.rx.pop_front())
    }

    fn bytes_available(&mut self) -> ltelink_transport::Result<usize> {
        Ok(self.rx.len())
    }

    fn write_all(&mut self, data: &[u8]) -> ltelink_transport::Result<()> {
        self.sent.extend_from_slice(data);
        self.window.extend_from_slice(data);
        self.advance();
        Ok(())
    }

    fn flush(&mut self) -> ltelink_transport::Result<()> {
        Ok(())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Engine config with millisecond-scale deadlines so timeout paths run
/// fast under test.
pub fn test_config() -> EngineConfig {
    let quick = Duration::from_millis(50);
    let tiny = Duration::from_millis(1);
    EngineConfig {
        timeouts: Timeouts {
            local: quick,
            settle: tiny,
            data_mode_guard: tiny,
            attach: quick,
            http_ready: quick,
            http_request: quick,
            response_header: quick,
            response_body: quick,
            tcp_connect: quick,
            tcp_write: quick,
            udp: quick,
        },
        chunk: ChunkPolicy {
            size: 2048,
            delay: tiny,
        },
        ..EngineConfig::default()
    }
}
