use std::time::Duration;

use ltelink_transport::{Deadline, ModemPort};
use ltelink_wire::{receive_framed, send_framed, send_framed_paced, WireError, MAX_LINE};
use tracing::debug;

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::session::{SessionId, SessionKind};
use crate::url::SplitUrl;

/// Settle before the verb command; the header phase leaves stray output
/// behind that would confuse the CONNECT wait.
const INTERPHASE_DRAIN: Duration = Duration::from_millis(30);

/// Outcome of an HTTP exchange.
///
/// 4xx/5xx statuses are data, not engine errors; the server answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Response body, truncated to the caller's capacity without error.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Sign-mapped result contract: `0` for status 100–399, the negated
    /// status otherwise. Engine failures carry positive
    /// [`EngineError::code`] values, so the sign alone tells a transport
    /// fault from an application-level refusal.
    pub fn return_code(&self) -> i32 {
        if (100..400).contains(&self.status) {
            0
        } else {
            -i32::from(self.status)
        }
    }

    pub fn is_success(&self) -> bool {
        self.return_code() == 0
    }
}

impl<P: ModemPort> Engine<P> {
    /// Perform an HTTP GET.
    ///
    /// `header` is optional extra request-header text. The body is bounded
    /// to `capacity` bytes; anything larger is silently truncated. The
    /// session is closed and deleted on every exit path.
    pub fn http_get(
        &mut self,
        url: &str,
        header: Option<&str>,
        capacity: usize,
    ) -> Result<HttpResponse> {
        let url = SplitUrl::parse(url, &self.config.limits)?;
        let id = self.http_open(&url)?;
        let outcome = self.run_get(id, &url, header, capacity);
        self.wind_up_session(SessionKind::Http);
        outcome
    }

    /// Perform an HTTP POST.
    ///
    /// A `Content-Length` header for `body` is injected ahead of any
    /// caller-supplied header text. Large bodies are streamed in paced
    /// chunks. The session is closed and deleted on every exit path.
    pub fn http_post(
        &mut self,
        url: &str,
        header: Option<&str>,
        body: &[u8],
        capacity: usize,
    ) -> Result<HttpResponse> {
        let max = self.config.limits.max_body;
        if body.len() > max {
            return Err(EngineError::PayloadTooLarge {
                size: body.len(),
                max,
            });
        }
        let url = SplitUrl::parse(url, &self.config.limits)?;
        let id = self.http_open(&url)?;
        let outcome = self.run_post(id, &url, header, body, capacity);
        self.wind_up_session(SessionKind::Http);
        outcome
    }

    /// Configure an HTTP session bound to the url's host/port/TLS and wait
    /// until it is ready. On a ready failure the half-configured session is
    /// wound up before the error surfaces.
    fn http_open(&mut self, url: &SplitUrl) -> Result<SessionId> {
        let command = format!(
            "AT+KHTTPCFG=1,\"{}\",{},{}",
            url.host,
            url.port,
            if url.use_ssl { 2 } else { 0 }
        );
        let id = self.configure_session(SessionKind::Http, &command)?;
        if let Err(err) = self.await_session_ready(SessionKind::Http, id, self.config.timeouts.http_ready)
        {
            self.wind_up_session(SessionKind::Http);
            return Err(err);
        }
        Ok(id)
    }

    fn run_get(
        &mut self,
        id: SessionId,
        url: &SplitUrl,
        header: Option<&str>,
        capacity: usize,
    ) -> Result<HttpResponse> {
        if let Some(header) = header {
            self.http_send_header(id, header, None)?;
        }
        self.line.drain(INTERPHASE_DRAIN)?;
        let verb = format!("AT+KHTTPGET={},\"{}\"", id, url.path);
        self.enter_data_mode(&verb, self.config.timeouts.http_request, EngineError::HttpRequest)?;
        self.read_http_response(capacity)
    }

    fn run_post(
        &mut self,
        id: SessionId,
        url: &SplitUrl,
        header: Option<&str>,
        body: &[u8],
        capacity: usize,
    ) -> Result<HttpResponse> {
        self.http_send_header(id, header.unwrap_or(""), Some(body.len()))?;
        self.line.drain(INTERPHASE_DRAIN)?;
        let verb = format!("AT+KHTTPPOST={},,\"{}\"", id, url.path);
        self.enter_data_mode(&verb, self.config.timeouts.http_request, EngineError::HttpRequest)?;
        let (line, config) = (&mut self.line, &self.config);
        send_framed_paced(
            line.get_mut(),
            body,
            config.sentinel.as_bytes(),
            config.chunk.size,
            config.chunk.delay,
        )
        .map_err(|err| EngineError::demote(err, EngineError::HttpRequest))?;
        self.read_http_response(capacity)
    }

    /// Enter header mode, stream the (possibly length-prefixed) header
    /// block, terminate it, and wait for the acknowledgement.
    fn http_send_header(
        &mut self,
        id: SessionId,
        header: &str,
        content_length: Option<usize>,
    ) -> Result<()> {
        let command = format!("AT+KHTTPHEADER={id}");
        self.enter_data_mode(&command, self.config.timeouts.http_request, EngineError::HttpConnect)?;

        let mut block = Vec::new();
        if let Some(length) = content_length {
            block.extend_from_slice(format!("Content-Length: {length}\r\n").as_bytes());
        }
        if !header.is_empty() {
            block.extend_from_slice(header.as_bytes());
            if !header.ends_with('\n') && !header.ends_with('\r') {
                block.extend_from_slice(b"\r\n");
            }
        }
        let (line, config) = (&mut self.line, &self.config);
        send_framed(line.get_mut(), &block, config.sentinel.as_bytes())
            .map_err(|err| EngineError::demote(err, EngineError::HttpHeader))?;
        std::thread::sleep(self.config.timeouts.data_mode_guard);
        self.command_tail(self.config.timeouts.http_request)
            .map_err(|err| err.demote_to(EngineError::HttpHeader))?;
        Ok(())
    }

    fn read_http_response(&mut self, capacity: usize) -> Result<HttpResponse> {
        let (status, declared) = self.read_response_header()?;
        let capacity = capacity.min(self.config.limits.max_body);
        let deadline = Deadline::after(self.config.timeouts.response_body);
        let (line, config) = (&mut self.line, &self.config);
        let body = receive_framed(line, deadline, declared, capacity, config.sentinel.as_bytes())
            .map_err(|err| EngineError::demote(err, EngineError::HttpResponseBody))?;
        debug!(status, body_len = body.len(), "http exchange complete");
        Ok(HttpResponse { status, body })
    }

    /// Parse the response status line and headers up to the blank
    /// separator line.
    fn read_response_header(&mut self) -> Result<(u16, Option<usize>)> {
        let deadline = Deadline::after(self.config.timeouts.response_header);
        let mut status = None;
        let mut declared = None;
        let mut buf = [0u8; MAX_LINE];
        loop {
            let len = self.line.read_line(deadline, &mut buf)?;
            if len == 0 {
                return Err(WireError::TimedOut.into());
            }
            let current = &buf[..len];
            if current[0] == b'\r' || len == 1 {
                break;
            }
            if status.is_none() {
                status = parse_status_line(current);
            }
            if declared.is_none() {
                declared = parse_content_length(current);
            }
        }
        let status = status.ok_or(EngineError::HttpResponseHeader)?;
        Ok((status, declared))
    }
}

fn parse_status_line(line: &[u8]) -> Option<u16> {
    let text = std::str::from_utf8(line).ok()?;
    let rest = text.strip_prefix("HTTP/")?;
    rest.split_whitespace().nth(1)?.parse().ok()
}

fn parse_content_length(line: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(line).ok()?;
    let (name, value) = text.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}
