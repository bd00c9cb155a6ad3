use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ltelink_engine::HttpResponse;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct HttpOutput {
    return_code: i32,
    status: u16,
    body_size: usize,
    body: String,
}

pub fn print_http(response: &HttpResponse, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = HttpOutput {
                return_code: response.return_code(),
                status: response.status,
                body_size: response.body.len(),
                body: payload_preview(&response.body),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CODE", "STATUS", "SIZE", "BODY"])
                .add_row(vec![
                    response.return_code().to_string(),
                    response.status.to_string(),
                    response.body.len().to_string(),
                    payload_preview(&response.body),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "code={} status={} size={} body={}",
                response.return_code(),
                response.status,
                response.body.len(),
                payload_preview(&response.body)
            );
        }
        OutputFormat::Raw => print_raw(&response.body),
    }
}

/// Modem identity and link quality, each field best-effort.
#[derive(Serialize, Default)]
pub struct InfoOutput {
    pub imei: Option<String>,
    pub clock: Option<String>,
    pub rssi_dbm: Option<i32>,
    pub attached: Option<bool>,
    pub address: Option<String>,
}

pub fn print_info(info: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(info).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["imei".to_string(), option_cell(&info.imei)]);
            table.add_row(vec!["clock".to_string(), option_cell(&info.clock)]);
            table.add_row(vec![
                "rssi_dbm".to_string(),
                option_cell(&info.rssi_dbm.map(|v| v.to_string())),
            ]);
            table.add_row(vec![
                "attached".to_string(),
                option_cell(&info.attached.map(|v| v.to_string())),
            ]);
            table.add_row(vec!["address".to_string(), option_cell(&info.address)]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "imei={} clock={} rssi_dbm={} attached={} address={}",
                option_cell(&info.imei),
                option_cell(&info.clock),
                option_cell(&info.rssi_dbm.map(|v| v.to_string())),
                option_cell(&info.attached.map(|v| v.to_string())),
                option_cell(&info.address)
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn option_cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}
