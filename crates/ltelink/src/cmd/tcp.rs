use ltelink_transport::Deadline;
use tracing::warn;

use crate::cmd::{open_engine, parse_duration, resolve_payload, ModemOpts, TcpArgs};
use crate::exit::{engine_error, CliResult, SUCCESS};
use crate::output::{print_raw, OutputFormat};

pub fn run(args: TcpArgs, modem: &ModemOpts, _format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.data, &args.file)?;
    let recv_wait = parse_duration(&args.recv_wait)?;
    let mut engine = open_engine(modem)?;

    engine
        .tcp_connect(&args.host, args.port)
        .map_err(|err| engine_error("tcp connect failed", err))?;

    let outcome = exchange(&mut engine, &payload, args.recv_max, recv_wait);
    if let Err(err) = engine.tcp_disconnect() {
        warn!(%err, "tcp disconnect failed");
    }

    let received = outcome?;
    print_raw(&received);
    Ok(SUCCESS)
}

fn exchange(
    engine: &mut ltelink_engine::Engine<ltelink_transport::TtyPort>,
    payload: &[u8],
    recv_max: usize,
    recv_wait: std::time::Duration,
) -> CliResult<Vec<u8>> {
    if !payload.is_empty() {
        engine
            .tcp_write(payload)
            .map_err(|err| engine_error("tcp write failed", err))?;
    }

    // Poll for a reply until the window closes or the buffer fills; an
    // empty poll is not an error, just silence so far.
    let mut received = Vec::new();
    let mut chunk = vec![0u8; recv_max.clamp(1, 4096)];
    let deadline = Deadline::after(recv_wait);
    while received.len() < recv_max && !deadline.expired() {
        let n = engine
            .tcp_read(&mut chunk)
            .map_err(|err| engine_error("tcp read failed", err))?;
        if n == 0 {
            std::thread::sleep(std::time::Duration::from_millis(100));
            continue;
        }
        let room = recv_max - received.len();
        received.extend_from_slice(&chunk[..n.min(room)]);
    }
    Ok(received)
}
