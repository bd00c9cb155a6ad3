use crate::cmd::{open_engine, GetArgs, ModemOpts};
use crate::exit::{engine_error, CliResult, HTTP_ERROR, SUCCESS};
use crate::output::{print_http, OutputFormat};

pub fn run(args: GetArgs, modem: &ModemOpts, format: OutputFormat) -> CliResult<i32> {
    let mut engine = open_engine(modem)?;
    let response = engine
        .http_get(&args.url, args.header.as_deref(), args.max_response)
        .map_err(|err| engine_error("http get failed", err))?;
    print_http(&response, format);
    Ok(if response.is_success() {
        SUCCESS
    } else {
        HTTP_ERROR
    })
}
