mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::{Command, ModemOpts};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "ltelink", version, about = "Cellular modem transport CLI")]
struct Cli {
    /// Serial device connected to the modem.
    #[arg(long, value_name = "PATH", default_value = "/dev/ttyACM0", global = true)]
    device: PathBuf,

    /// Serial baud rate.
    #[arg(long, value_name = "BAUD", default_value_t = 115_200, global = true)]
    baud: u32,

    /// Skip the init command sequence (modem already initialized).
    #[arg(long, global = true)]
    no_init: bool,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let modem = ModemOpts {
        device: cli.device,
        baud: cli.baud,
        no_init: cli.no_init,
    };
    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &modem, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
