mod common;

use common::{cmd, test_config, FakeModem};
use ltelink_engine::{Engine, EngineError, NetworkTime};

#[test]
fn init_runs_the_setup_sequence_and_registers_the_pattern() {
    let mut engine = Engine::new(FakeModem::new(vec![]), test_config());
    engine.init().unwrap();

    let err = engine.init().unwrap_err();
    assert!(matches!(err, EngineError::AlreadyInitialized));

    let transcript = engine.into_port().sent_text();
    for command in ["ATZ\r\n", "ATE1\r\n", "AT+KSLEEP=2\r\n", "AT+KPATTERN=\"@EOD@\"\r\n"] {
        assert!(transcript.contains(command), "missing {command:?}");
    }
}

#[test]
fn attach_configures_the_profile_then_retries_cgatt() {
    let modem = FakeModem::new(vec![
        cmd(
            "AT+KCNXCFG=1,\"GPRS\",\"apn.example\",\"user\",\"pw\"",
            b"OK\r\n",
        ),
        cmd("AT+KCNXPROFILE=1", b"OK\r\n"),
        cmd("AT+CGATT=1", b"ERROR\r\n"),
        cmd("AT+CGATT=1", b"OK\r\n"),
    ]);
    let mut engine = Engine::new(modem, test_config());
    engine.attach("apn.example", "user", "pw").unwrap();
    assert_eq!(engine.into_port().remaining_steps(), 0);
}

#[test]
fn attach_gives_up_after_the_retry_budget() {
    let steps = (0..5)
        .map(|_| cmd("AT+CGATT=1", b"ERROR\r\n"))
        .collect::<Vec<_>>();
    let mut all = vec![
        cmd("AT+KCNXCFG=1,\"GPRS\",\"apn.example\",\"\",\"\"", b"OK\r\n"),
        cmd("AT+KCNXPROFILE=1", b"OK\r\n"),
    ];
    all.extend(steps);
    let mut engine = Engine::new(FakeModem::new(all), test_config());

    let err = engine.attach("apn.example", "", "").unwrap_err();
    assert!(matches!(err, EngineError::AttachFailed));
    assert_eq!(err.code(), 199);
    assert_eq!(engine.into_port().remaining_steps(), 0);
}

#[test]
fn rejected_profile_stops_the_attach_early() {
    let modem = FakeModem::new(vec![cmd(
        "AT+KCNXCFG=1,\"GPRS\",\"apn.example\",\"\",\"\"",
        b"ERROR\r\n",
    )]);
    let mut engine = Engine::new(modem, test_config());

    let err = engine.attach("apn.example", "", "").unwrap_err();
    assert!(matches!(err, EngineError::ProfileRejected));
    assert!(!engine.into_port().sent_text().contains("AT+CGATT"));
}

#[test]
fn imei_comes_from_the_echoed_response() {
    let modem = FakeModem::new(vec![cmd(
        "AT+CGSN",
        b"AT+CGSN\r\r\n354723090001234\r\nOK\r\n",
    )]);
    let mut engine = Engine::new(modem, test_config());
    assert_eq!(engine.imei().unwrap(), "354723090001234");
}

#[test]
fn network_clock_parses_and_validates() {
    let modem = FakeModem::new(vec![cmd(
        "AT+CCLK?",
        b"+CCLK: \"24/07/15,08:30:59+36\"\r\nOK\r\n",
    )]);
    let mut engine = Engine::new(modem, test_config());
    assert_eq!(
        engine.network_clock().unwrap(),
        NetworkTime {
            year: 2024,
            month: 7,
            day: 15,
            hours: 8,
            minutes: 30,
            seconds: 59,
        }
    );
}

#[test]
fn unset_clock_reports_not_valid() {
    let modem = FakeModem::new(vec![cmd(
        "AT+CCLK?",
        b"+CCLK: \"00/01/01,00:00:07+00\"\r\nOK\r\n",
    )]);
    let mut engine = Engine::new(modem, test_config());
    let err = engine.network_clock().unwrap_err();
    assert!(matches!(err, EngineError::ClockNotValid));
    assert_eq!(err.code(), 104);
}

#[test]
fn rssi_converts_signal_quality_to_dbm() {
    let modem = FakeModem::new(vec![cmd("AT+CSQ", b"+CSQ: 18,99\r\nOK\r\n")]);
    let mut engine = Engine::new(modem, test_config());
    assert_eq!(engine.rssi().unwrap(), 2 * 18 - 113);
}

#[test]
fn unmeasurable_signal_is_an_error() {
    let modem = FakeModem::new(vec![cmd("AT+CSQ", b"+CSQ: 99,99\r\nOK\r\n")]);
    let mut engine = Engine::new(modem, test_config());
    let err = engine.rssi().unwrap_err();
    assert!(matches!(err, EngineError::SignalUnknown));
}

#[test]
fn service_query_reports_attached_state() {
    let modem = FakeModem::new(vec![cmd("AT+CGATT?", b"+CGATT: 1\r\nOK\r\n")]);
    let mut engine = Engine::new(modem, test_config());
    assert!(engine.service_attached().unwrap());
}

#[test]
fn simless_modem_reports_detached_instead_of_failing() {
    let modem = FakeModem::new(vec![cmd("AT+CGATT?", b"ERROR\r\n")]);
    let mut engine = Engine::new(modem, test_config());
    assert!(!engine.service_attached().unwrap());
}

#[test]
fn local_address_is_extracted_from_the_indicator() {
    let modem = FakeModem::new(vec![cmd(
        "AT+KCGPADDR=1",
        b"+KCGPADDR: 1,\"10.114.7.23\"\r\nOK\r\n",
    )]);
    let mut engine = Engine::new(modem, test_config());
    assert_eq!(engine.local_address().unwrap(), "10.114.7.23");
}

#[test]
fn root_ca_upload_announces_length_and_streams_the_pem() {
    let pem = "-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----\n";
    let announce = format!("AT+KCERTSTORE=0,{}", pem.len());
    let modem = FakeModem::new(vec![cmd(&announce, b"CONNECT\r\nOK\r\n")]);
    let mut engine = Engine::new(modem, test_config());
    engine.store_root_ca(pem).unwrap();
    assert!(engine.into_port().sent_text().contains(pem));
}

#[test]
fn oversized_root_ca_is_rejected_before_io() {
    let mut engine = Engine::new(FakeModem::new(vec![]), test_config());
    let pem = "x".repeat(4097);
    let err = engine.store_root_ca(&pem).unwrap_err();
    assert!(matches!(err, EngineError::InvalidParameter(_)));
    assert!(engine.into_port().sent.is_empty());
}
