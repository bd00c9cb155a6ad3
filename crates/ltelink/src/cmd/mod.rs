use std::path::PathBuf;

use clap::{Args, Subcommand};
use ltelink_engine::{Engine, EngineConfig};
use ltelink_transport::TtyPort;

use crate::exit::{engine_error, transport_error, CliResult};
use crate::output::OutputFormat;

pub mod attach;
pub mod get;
pub mod info;
pub mod post;
pub mod tcp;
pub mod udp;

/// How to reach the modem.
#[derive(Clone, Debug)]
pub struct ModemOpts {
    pub device: PathBuf,
    pub baud: u32,
    pub no_init: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Perform an HTTP GET through the modem.
    Get(GetArgs),
    /// Perform an HTTP POST through the modem.
    Post(PostArgs),
    /// Connect, send, and receive over a TCP session.
    Tcp(TcpArgs),
    /// Send a one-shot UDP datagram.
    Udp(UdpArgs),
    /// Configure the connection profile and attach to the network.
    Attach(AttachArgs),
    /// Print modem identity and link status.
    Info(InfoArgs),
}

pub fn run(command: Command, modem: &ModemOpts, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Get(args) => get::run(args, modem, format),
        Command::Post(args) => post::run(args, modem, format),
        Command::Tcp(args) => tcp::run(args, modem, format),
        Command::Udp(args) => udp::run(args, modem, format),
        Command::Attach(args) => attach::run(args, modem, format),
        Command::Info(args) => info::run(args, modem, format),
    }
}

pub(crate) fn open_engine(modem: &ModemOpts) -> CliResult<Engine<TtyPort>> {
    let port = TtyPort::open(&modem.device, modem.baud)
        .map_err(|err| transport_error("failed to open serial device", err))?;
    let mut engine = Engine::new(port, EngineConfig::default());
    if !modem.no_init {
        engine
            .init()
            .map_err(|err| engine_error("modem init failed", err))?;
    }
    Ok(engine)
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// URL to fetch (http or https).
    pub url: String,
    /// Extra request header text.
    #[arg(long)]
    pub header: Option<String>,
    /// Response body capacity in bytes; larger bodies are truncated.
    #[arg(long, default_value_t = 1023)]
    pub max_response: usize,
}

#[derive(Args, Debug)]
pub struct PostArgs {
    /// URL to post to (http or https).
    pub url: String,
    /// Request body as a string.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the request body from a file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Extra request header text.
    #[arg(long)]
    pub header: Option<String>,
    /// Response body capacity in bytes; larger bodies are truncated.
    #[arg(long, default_value_t = 1023)]
    pub max_response: usize,
}

#[derive(Args, Debug)]
pub struct TcpArgs {
    /// Peer host name or IPv4 address.
    pub host: String,
    /// Peer TCP port.
    pub port: u16,
    /// Payload to send as a string.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the payload from a file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Maximum bytes to read back.
    #[arg(long, default_value_t = 4096)]
    pub recv_max: usize,
    /// How long to poll for a reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub recv_wait: String,
}

#[derive(Args, Debug)]
pub struct UdpArgs {
    /// Destination host name or IPv4 address.
    pub host: String,
    /// Destination UDP port.
    pub port: u16,
    /// Datagram payload as a string.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the datagram payload from a file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AttachArgs {
    /// Access point name.
    #[arg(long)]
    pub apn: String,
    /// APN user name.
    #[arg(long, default_value = "")]
    pub user: String,
    /// APN password.
    #[arg(long, default_value = "")]
    pub password: String,
}

#[derive(Args, Debug, Default)]
pub struct InfoArgs {}

/// Resolve a `--data`/`--file` pair into payload bytes.
pub(crate) fn resolve_payload(
    data: &Option<String>,
    file: &Option<PathBuf>,
) -> CliResult<Vec<u8>> {
    if let Some(data) = data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = file {
        return std::fs::read(path).map_err(|err| {
            crate::exit::CliError::new(
                crate::exit::USAGE,
                format!("failed reading {}: {err}", path.display()),
            )
        });
    }
    Ok(Vec::new())
}

/// Parse `5s` / `500ms` style durations.
pub(crate) fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    use crate::exit::{CliError, USAGE};

    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(std::time::Duration::from_millis(value)),
        _ => Ok(std::time::Duration::from_secs(value)),
    }
}
