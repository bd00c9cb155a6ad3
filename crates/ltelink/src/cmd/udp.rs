use tracing::warn;

use crate::cmd::{open_engine, resolve_payload, ModemOpts, UdpArgs};
use crate::exit::{engine_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: UdpArgs, modem: &ModemOpts, _format: OutputFormat) -> CliResult<i32> {
    let datagram = resolve_payload(&args.data, &args.file)?;
    let mut engine = open_engine(modem)?;

    engine
        .udp_open()
        .map_err(|err| engine_error("udp open failed", err))?;
    let outcome = engine
        .udp_send(&args.host, args.port, &datagram)
        .map_err(|err| engine_error("udp send failed", err));
    if let Err(err) = engine.udp_close() {
        warn!(%err, "udp close failed");
    }
    outcome?;
    println!("sent {} bytes to {}:{}", datagram.len(), args.host, args.port);
    Ok(SUCCESS)
}
