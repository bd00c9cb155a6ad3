mod common;

use common::{cmd, data, test_config, FakeModem};
use ltelink_engine::{Engine, EngineError};
use ltelink_wire::WireError;

#[test]
fn get_with_declared_length_returns_body_and_zero_code() {
    let modem = FakeModem::new(vec![
        cmd(
            "AT+KHTTPCFG=1,\"example.test\",80,0",
            b"+KHTTPCFG: 1\r\nOK\r\n+KHTTP_IND: 1,1\r\n",
        ),
        cmd(
            "AT+KHTTPGET=1,\"/data\"",
            b"CONNECT\r\nHTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello@EOD@",
        ),
    ]);
    let mut engine = Engine::new(modem, test_config());

    let response = engine.http_get("http://example.test/data", None, 1023).unwrap();
    assert_eq!(response.return_code(), 0);
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"hello");

    let modem = engine.into_port();
    assert_eq!(modem.remaining_steps(), 0);
    // Wind-up runs on the success path too.
    let transcript = modem.sent_text();
    assert!(transcript.contains("AT+KHTTPCLOSE=1\r\n"));
    assert!(transcript.contains("AT+KHTTPDEL=1\r\n"));
}

#[test]
fn get_http_error_status_maps_to_negated_code_with_body() {
    let modem = FakeModem::new(vec![
        cmd(
            "AT+KHTTPCFG=1,\"example.test\",80,0",
            b"+KHTTPCFG: 1\r\nOK\r\n+KHTTP_IND: 1,1\r\n",
        ),
        cmd(
            "AT+KHTTPGET=1,\"/missing\"",
            b"CONNECT\r\nHTTP/1.1 404 Not Found\r\nContent-Length: 2\r\n\r\nnf@EOD@",
        ),
    ]);
    let mut engine = Engine::new(modem, test_config());

    let response = engine
        .http_get("http://example.test/missing", None, 1023)
        .unwrap();
    assert_eq!(response.return_code(), -404);
    assert_eq!(response.body, b"nf");
}

#[test]
fn get_without_content_length_scans_for_the_sentinel() {
    let modem = FakeModem::new(vec![
        cmd(
            "AT+KHTTPCFG=1,\"example.test\",80,0",
            b"+KHTTPCFG: 1\r\nOK\r\n+KHTTP_IND: 1,1\r\n",
        ),
        cmd(
            "AT+KHTTPGET=1,\"/stream\"",
            b"CONNECT\r\nHTTP/1.1 200 OK\r\n\r\nstreamed body@EOD@",
        ),
    ]);
    let mut engine = Engine::new(modem, test_config());

    let response = engine
        .http_get("http://example.test/stream", None, 1023)
        .unwrap();
    assert_eq!(response.body, b"streamed body");
}

#[test]
fn get_truncates_oversized_body_without_error() {
    let modem = FakeModem::new(vec![
        cmd(
            "AT+KHTTPCFG=1,\"example.test\",80,0",
            b"+KHTTPCFG: 1\r\nOK\r\n+KHTTP_IND: 1,1\r\n",
        ),
        cmd(
            "AT+KHTTPGET=1,\"/big\"",
            b"CONNECT\r\nHTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n0123456789@EOD@",
        ),
    ]);
    let mut engine = Engine::new(modem, test_config());

    let response = engine.http_get("http://example.test/big", None, 4).unwrap();
    assert_eq!(response.return_code(), 0);
    assert_eq!(response.body, b"0123");
}

#[test]
fn get_with_header_streams_it_before_the_verb() {
    let modem = FakeModem::new(vec![
        cmd(
            "AT+KHTTPCFG=1,\"example.test\",80,0",
            b"+KHTTPCFG: 1\r\nOK\r\n+KHTTP_IND: 1,1\r\n",
        ),
        cmd("AT+KHTTPHEADER=1", b"CONNECT\r\n"),
        data(b"OK\r\n"),
        cmd(
            "AT+KHTTPGET=1,\"/data\"",
            b"CONNECT\r\nHTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n",
        ),
    ]);
    let mut engine = Engine::new(modem, test_config());

    let response = engine
        .http_get("http://example.test/data", Some("Accept: text/plain"), 1023)
        .unwrap();
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());

    let transcript = engine.into_port().sent_text();
    assert!(transcript.contains("Accept: text/plain\r\n@EOD@"));
}

#[test]
fn https_url_configures_tls_and_port_443() {
    let modem = FakeModem::new(vec![
        cmd(
            "AT+KHTTPCFG=1,\"secure.test\",443,2",
            b"+KHTTPCFG: 1\r\nOK\r\n+KHTTP_IND: 1,1\r\n",
        ),
        cmd(
            "AT+KHTTPGET=1,\"/\"",
            b"CONNECT\r\nHTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok@EOD@",
        ),
    ]);
    let mut engine = Engine::new(modem, test_config());

    let response = engine.http_get("https://secure.test", None, 1023).unwrap();
    assert_eq!(response.status, 200);
}

#[test]
fn post_injects_content_length_and_streams_the_body() {
    let modem = FakeModem::new(vec![
        cmd(
            "AT+KHTTPCFG=1,\"example.test\",80,0",
            b"+KHTTPCFG: 1\r\nOK\r\n+KHTTP_IND: 1,1\r\n",
        ),
        cmd("AT+KHTTPHEADER=1", b"CONNECT\r\n"),
        data(b"OK\r\n"),
        cmd("AT+KHTTPPOST=1,,\"/ingest\"", b"CONNECT\r\n"),
        data(b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n"),
    ]);
    let mut engine = Engine::new(modem, test_config());

    let response = engine
        .http_post("http://example.test/ingest", None, b"abc", 1023)
        .unwrap();
    assert_eq!(response.return_code(), 0);
    assert_eq!(response.status, 201);
    assert!(response.body.is_empty());

    let transcript = engine.into_port().sent_text();
    assert!(transcript.contains("Content-Length: 3\r\n"));
    assert!(transcript.contains("abc@EOD@"));
}

#[test]
fn post_with_no_response_times_out_and_frees_the_session() {
    let modem = FakeModem::new(vec![
        cmd(
            "AT+KHTTPCFG=1,\"example.test\",80,0",
            b"+KHTTPCFG: 1\r\nOK\r\n+KHTTP_IND: 1,1\r\n",
        ),
        cmd("AT+KHTTPHEADER=1", b"CONNECT\r\n"),
        data(b"OK\r\n"),
        cmd("AT+KHTTPPOST=1,,\"/ingest\"", b"CONNECT\r\n"),
        data(b""),
    ]);
    let mut engine = Engine::new(modem, test_config());

    let err = engine
        .http_post("http://example.test/ingest", None, b"abc", 1023)
        .unwrap_err();
    assert!(matches!(err, EngineError::Wire(WireError::TimedOut)));
    assert_eq!(err.code(), 901);

    // The session slot is freed even on the timeout path.
    let transcript = engine.into_port().sent_text();
    assert!(transcript.contains("AT+KHTTPCLOSE=1\r\n"));
    assert!(transcript.contains("AT+KHTTPDEL=1\r\n"));
}

#[test]
fn ready_timeout_winds_up_the_half_configured_session() {
    let modem = FakeModem::new(vec![cmd(
        "AT+KHTTPCFG=1,\"example.test\",80,0",
        b"+KHTTPCFG: 2\r\nOK\r\n",
    )]);
    let mut engine = Engine::new(modem, test_config());

    let err = engine
        .http_get("http://example.test/data", None, 1023)
        .unwrap_err();
    assert_eq!(err.code(), 901);

    let transcript = engine.into_port().sent_text();
    assert!(transcript.contains("AT+KHTTPCLOSE=2\r\n"));
    assert!(transcript.contains("AT+KHTTPDEL=2\r\n"));
}

#[test]
fn session_error_from_configure_needs_no_cleanup() {
    let modem = FakeModem::new(vec![cmd(
        "AT+KHTTPCFG=1,\"example.test\",80,0",
        b"ERROR\r\n",
    )]);
    let mut engine = Engine::new(modem, test_config());

    let err = engine
        .http_get("http://example.test/data", None, 1023)
        .unwrap_err();
    assert_eq!(err.code(), 701);

    // No id was allocated, so no close/delete can target anything.
    let transcript = engine.into_port().sent_text();
    assert!(!transcript.contains("AT+KHTTPCLOSE"));
}

#[test]
fn bad_url_is_rejected_before_any_io() {
    let modem = FakeModem::new(vec![]);
    let mut engine = Engine::new(modem, test_config());

    let err = engine.http_get("gopher://example.test", None, 1023).unwrap_err();
    assert!(matches!(err, EngineError::InvalidParameter(_)));
    assert!(engine.into_port().sent.is_empty());
}

#[test]
fn consecutive_exchanges_reuse_the_freed_slot() {
    let modem = FakeModem::new(vec![
        cmd(
            "AT+KHTTPCFG=1,\"example.test\",80,0",
            b"+KHTTPCFG: 1\r\nOK\r\n+KHTTP_IND: 1,1\r\n",
        ),
        cmd(
            "AT+KHTTPGET=1,\"/one\"",
            b"CONNECT\r\nHTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\na@EOD@",
        ),
        cmd(
            "AT+KHTTPCFG=1,\"example.test\",80,0",
            b"+KHTTPCFG: 1\r\nOK\r\n+KHTTP_IND: 1,1\r\n",
        ),
        cmd(
            "AT+KHTTPGET=1,\"/two\"",
            b"CONNECT\r\nHTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nb@EOD@",
        ),
    ]);
    let mut engine = Engine::new(modem, test_config());

    let first = engine.http_get("http://example.test/one", None, 1023).unwrap();
    let second = engine.http_get("http://example.test/two", None, 1023).unwrap();
    assert_eq!(first.body, b"a");
    assert_eq!(second.body, b"b");
    assert_eq!(engine.into_port().remaining_steps(), 0);
}
