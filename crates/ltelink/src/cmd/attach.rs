use tracing::info;

use crate::cmd::{open_engine, AttachArgs, ModemOpts};
use crate::exit::{engine_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: AttachArgs, modem: &ModemOpts, _format: OutputFormat) -> CliResult<i32> {
    let mut engine = open_engine(modem)?;
    engine
        .attach(&args.apn, &args.user, &args.password)
        .map_err(|err| engine_error("attach failed", err))?;
    info!(apn = %args.apn, "attached");

    match engine.local_address() {
        Ok(address) => println!("attached, local address {address}"),
        Err(_) => println!("attached"),
    }
    Ok(SUCCESS)
}
