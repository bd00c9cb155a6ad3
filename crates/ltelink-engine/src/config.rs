use std::time::Duration;

/// Deadline budget for each class of modem exchange.
///
/// Defaults match the HL7800 firmware's observed behavior; deployments on
/// slower bearers may need to stretch the network-facing ones.
#[derive(Clone, Debug)]
pub struct Timeouts {
    /// Local command round-trip (no network involved).
    pub local: Duration,
    /// Settle time before discarding unread output after fire-and-forget
    /// commands.
    pub settle: Duration,
    /// Pause between announcing data mode and expecting the CONNECT prompt.
    pub data_mode_guard: Duration,
    /// Network attach (`AT+CGATT`).
    pub attach: Duration,
    /// HTTP session ready indicator.
    pub http_ready: Duration,
    /// HTTP request round-trip, from verb command to data mode.
    pub http_request: Duration,
    /// Response header fully read.
    pub response_header: Duration,
    /// Response body fully read.
    pub response_body: Duration,
    /// TCP connect ready indicator.
    pub tcp_connect: Duration,
    /// TCP send/receive data phase.
    pub tcp_write: Duration,
    /// UDP exchange.
    pub udp: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            local: Duration::from_secs(3),
            settle: Duration::from_millis(500),
            data_mode_guard: Duration::from_millis(200),
            attach: Duration::from_secs(60),
            http_ready: Duration::from_secs(10),
            http_request: Duration::from_secs(30),
            response_header: Duration::from_secs(30),
            response_body: Duration::from_secs(30),
            tcp_connect: Duration::from_secs(60),
            tcp_write: Duration::from_secs(60),
            udp: Duration::from_secs(10),
        }
    }
}

/// Firmware-documented size limits, runtime-configurable per deployment.
#[derive(Clone, Debug)]
pub struct Limits {
    /// Longest accepted host name.
    pub max_host: usize,
    /// Longest accepted URL path.
    pub max_path: usize,
    /// Largest single TCP write.
    pub max_tcp_write: usize,
    /// Largest single TCP read.
    pub max_tcp_read: usize,
    /// Largest announced burst write.
    pub max_tcp_burst: usize,
    /// Largest UDP datagram.
    pub max_udp_payload: usize,
    /// Default cap on collected command responses.
    pub max_response: usize,
    /// Cap on HTTP bodies, declared or streamed.
    pub max_body: usize,
    /// Largest root CA certificate accepted by the cert store.
    pub max_root_ca: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_host: 200,
            max_path: 200,
            max_tcp_write: 4096,
            max_tcp_read: 4096,
            max_tcp_burst: 32_000,
            max_udp_payload: 1472,
            max_response: 1023,
            max_body: 384 * 1024,
            max_root_ca: 4096,
        }
    }
}

/// Pacing for bulk writes when hardware flow control is unavailable.
///
/// The delay between chunks keeps the modem's UART buffer from overrunning;
/// it is load-bearing, not cosmetic.
#[derive(Clone, Debug)]
pub struct ChunkPolicy {
    pub size: usize,
    pub delay: Duration,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            size: 2048,
            delay: Duration::from_millis(200),
        }
    }
}

/// How raw socket payloads are delimited on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramingMode {
    /// Sentinel-terminated streaming, the firmware's native mode. Payloads
    /// containing the sentinel are rejected before any I/O.
    Sentinel,
    /// `$`-escape payload bytes that could collide with the sentinel.
    /// Fully binary-safe, but both endpoints must speak it and reads must
    /// align with writes.
    Escaped,
}

/// Engine configuration: sentinel, framing mode, timeouts, limits, pacing.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// End-of-data marker registered with the modem at init. Chosen to be
    /// hard to encounter in real payloads.
    pub sentinel: String,
    pub framing: FramingMode,
    pub timeouts: Timeouts,
    pub limits: Limits,
    pub chunk: ChunkPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sentinel: "@EOD@".to_string(),
            framing: FramingMode::Sentinel,
            timeouts: Timeouts::default(),
            limits: Limits::default(),
            chunk: ChunkPolicy::default(),
        }
    }
}
