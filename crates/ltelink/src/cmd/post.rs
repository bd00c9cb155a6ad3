use crate::cmd::{open_engine, resolve_payload, ModemOpts, PostArgs};
use crate::exit::{engine_error, CliResult, HTTP_ERROR, SUCCESS};
use crate::output::{print_http, OutputFormat};

pub fn run(args: PostArgs, modem: &ModemOpts, format: OutputFormat) -> CliResult<i32> {
    let body = resolve_payload(&args.data, &args.file)?;
    let mut engine = open_engine(modem)?;
    let response = engine
        .http_post(&args.url, args.header.as_deref(), &body, args.max_response)
        .map_err(|err| engine_error("http post failed", err))?;
    print_http(&response, format);
    Ok(if response.is_success() {
        SUCCESS
    } else {
        HTTP_ERROR
    })
}
