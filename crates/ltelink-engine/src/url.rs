use crate::config::Limits;
use crate::error::{EngineError, Result};

/// A URL decomposed for the modem's http verbs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitUrl {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub use_ssl: bool,
}

impl SplitUrl {
    /// Decompose `scheme://host[:port][/path]`.
    ///
    /// A missing port defaults to the scheme's (80 for `http`, 443 for
    /// `https`); a missing path defaults to `/`. Hosts and paths past the
    /// configured limits are rejected before any I/O.
    pub fn parse(url: &str, limits: &Limits) -> Result<Self> {
        let (rest, default_port, use_ssl) = if let Some(rest) = url.strip_prefix("https://") {
            (rest, 443u16, true)
        } else if let Some(rest) = url.strip_prefix("http://") {
            (rest, 80u16, false)
        } else {
            return Err(EngineError::InvalidParameter(format!(
                "unsupported url scheme: {url}"
            )));
        };

        let (host, tail) = match rest.find([':', '/']) {
            Some(at) => (&rest[..at], &rest[at..]),
            None => (rest, ""),
        };
        if host.is_empty() {
            return Err(EngineError::InvalidParameter("url host is empty".to_string()));
        }
        if host.len() > limits.max_host {
            return Err(EngineError::InvalidParameter(format!(
                "url host exceeds {} bytes",
                limits.max_host
            )));
        }

        let (port, path) = if let Some(after_colon) = tail.strip_prefix(':') {
            let digits_end = after_colon
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_colon.len());
            let digits = &after_colon[..digits_end];
            let port = digits.parse::<u16>().map_err(|_| {
                EngineError::InvalidParameter(format!("invalid url port: {after_colon:?}"))
            })?;
            let rest = &after_colon[digits_end..];
            (port, if rest.is_empty() { "/" } else { rest })
        } else if tail.is_empty() {
            (default_port, "/")
        } else {
            (default_port, tail)
        };

        if path.len() > limits.max_path {
            return Err(EngineError::InvalidParameter(format!(
                "url path exceeds {} bytes",
                limits.max_path
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
            use_ssl,
        })
    }
}
