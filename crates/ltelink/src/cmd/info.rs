use crate::cmd::{open_engine, InfoArgs, ModemOpts};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_info, InfoOutput, OutputFormat};

/// Every field is best-effort: a modem without a SIM still reports what it
/// can instead of failing the whole query.
pub fn run(_args: InfoArgs, modem: &ModemOpts, format: OutputFormat) -> CliResult<i32> {
    let mut engine = open_engine(modem)?;

    let info = InfoOutput {
        imei: engine.imei().ok(),
        clock: engine.network_clock().ok().map(|t| t.to_string()),
        rssi_dbm: engine.rssi().ok(),
        attached: engine.service_attached().ok(),
        address: engine.local_address().ok(),
    };
    print_info(&info, format);
    Ok(SUCCESS)
}
