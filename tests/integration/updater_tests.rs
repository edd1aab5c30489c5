//! Updater integration tests.
//!
//! Drives `OtaUpdater::run` end-to-end against the mock transport, flash
//! and clock, asserting on the flash call history and emitted events.

use crate::mock_hw::{FlashCall, ManualClock, MockFlash, MockTransport, RecordingSink, Step};
use thermo_monitor::adapters::flash::SimFlashSink;
use thermo_monitor::app::events::OtaEvent;
use thermo_monitor::app::ports::TransportError;
use thermo_monitor::app::updater::{OtaUpdater, UpdateReport};
use thermo_monitor::config::OtaConfig;
use thermo_monitor::error::{MalformedHeader, OtaError};

fn wire(payload: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
        payload.len()
    )
    .into_bytes();
    out.extend_from_slice(payload);
    out
}

fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

struct Rig {
    config: OtaConfig,
    clock: ManualClock,
    flash: MockFlash,
    events: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self {
            config: OtaConfig::default(),
            clock: ManualClock::new(),
            flash: MockFlash::new(),
            events: RecordingSink::new(),
        }
    }

    fn run(&mut self, transport: &mut MockTransport, buf_len: usize) -> Result<UpdateReport, OtaError> {
        let mut buf = vec![0u8; buf_len];
        OtaUpdater::new(&self.config).run(
            "user2.bin",
            &mut buf,
            transport,
            &mut self.flash,
            &self.clock,
            &mut self.events,
        )
    }
}

// ── Happy path ────────────────────────────────────────────────

#[test]
fn fragmented_download_is_committed() {
    let payload = image(1000);
    let mut rig = Rig::new();
    let mut t = MockTransport::chunked(&wire(&payload), 7);

    let report = rig.run(&mut t, 64).unwrap();

    assert_eq!(rig.flash.image, payload);
    assert!(rig.flash.committed);
    assert_eq!(rig.flash.count(FlashCall::Begin), 1);
    assert_eq!(rig.flash.count(FlashCall::Finish), 1);
    assert_eq!(rig.flash.aborts(), 0);
    assert_eq!(t.close_calls, 1);
    assert_eq!(report.image_bytes, 1000);
    assert_eq!(report.header_bytes, wire(&payload).len() - payload.len());
}

#[test]
fn request_targets_configured_image() {
    let mut rig = Rig::new();
    let mut t = MockTransport::chunked(&wire(b"x"), 64);
    rig.run(&mut t, 64).unwrap();

    assert_eq!(
        t.request(),
        "GET /esp8266_fota/user2.bin HTTP/1.1\r\nHost: 192.168.0.2\r\n\
         User-Agent: ESP8266\r\nConnection: close\r\n\r\n"
    );
}

#[test]
fn events_follow_download_order() {
    let payload = image(1000);
    let mut rig = Rig::new();
    let mut t = MockTransport::chunked(&wire(&payload), 7);
    rig.run(&mut t, 64).unwrap();

    let ev = &rig.events.events;
    assert!(matches!(ev[0], OtaEvent::RequestSent { .. }));
    assert_eq!(ev[1], OtaEvent::HeaderParsed { content_length: 1000 });
    assert_eq!(ev.last(), Some(&OtaEvent::Completed { bytes: 1000 }));

    let progress = rig.events.progress();
    assert_eq!(progress.len(), 10);
    assert!(progress.windows(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(progress.last(), Some(&(1000, 1000)));
}

#[test]
fn bytes_past_content_length_are_dropped() {
    let mut rig = Rig::new();
    let mut t = MockTransport::new(vec![
        Step::Data(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nHE".to_vec()),
        Step::Data(b"LLOEXTRA".to_vec()),
        Step::Data(b"never read".to_vec()),
    ]);

    let report = rig.run(&mut t, 64).unwrap();
    assert_eq!(rig.flash.image, b"HELLO");
    assert_eq!(report.image_bytes, 5);
    assert_eq!(t.reads, 2);
}

#[test]
fn one_byte_buffer_still_works() {
    let payload = image(300);
    let mut rig = Rig::new();
    let mut t = MockTransport::new(vec![Step::Data(wire(&payload))]);

    rig.run(&mut t, 1).unwrap();
    assert_eq!(rig.flash.image, payload);
    assert!(rig.flash.committed);
}

#[test]
fn zero_length_image_commits_empty() {
    let mut rig = Rig::new();
    let mut t = MockTransport::chunked(&wire(b""), 5);

    let report = rig.run(&mut t, 64).unwrap();
    assert_eq!(report.image_bytes, 0);
    assert_eq!(rig.flash.count(FlashCall::Write(0)), 0);
    assert!(rig.flash.committed);
}

#[test]
fn read_timeouts_are_retried() {
    let mut rig = Rig::new();
    let mut t = MockTransport::new(vec![
        Step::Stall(5_000),
        Step::Data(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\n".to_vec()),
        Step::Stall(5_000),
        Step::Data(b"abc".to_vec()),
    ])
    .with_clock(rig.clock.clone());

    let report = rig.run(&mut t, 64).unwrap();
    assert_eq!(rig.flash.image, b"abc");
    assert_eq!(report.elapsed_ms, 10_000);
}

// ── Failures ──────────────────────────────────────────────────

#[test]
fn early_close_aborts_once() {
    let payload = image(100);
    let full = wire(&payload);
    let mut rig = Rig::new();
    let mut t = MockTransport::chunked(&full[..full.len() - 10], 16);

    let err = rig.run(&mut t, 64).unwrap_err();
    assert_eq!(err, OtaError::TransportClosedEarly);
    assert_eq!(rig.flash.aborts(), 1);
    assert_eq!(rig.flash.count(FlashCall::Finish), 0);
    assert!(!rig.flash.committed);
    assert_eq!(rig.flash.image, &payload[..90]);
    assert_eq!(t.close_calls, 1);
    assert_eq!(rig.events.events.last(), Some(&OtaEvent::Failed(OtaError::TransportClosedEarly)));
}

#[test]
fn close_inside_header_writes_nothing() {
    let mut rig = Rig::new();
    let mut t = MockTransport::new(vec![Step::Data(b"HTTP/1.1 200 OK\r\nContent-Le".to_vec())]);

    assert_eq!(rig.run(&mut t, 64).unwrap_err(), OtaError::TransportClosedEarly);
    assert_eq!(rig.flash.calls, vec![FlashCall::Begin, FlashCall::Abort]);
}

#[test]
fn error_status_is_never_flashed() {
    let mut rig = Rig::new();
    let body = b"<html>not found</html>";
    let mut response = format!("HTTP/1.1 404 Not Found\r\nContent-Length: {}\r\n\r\n", body.len()).into_bytes();
    response.extend_from_slice(body);
    let mut t = MockTransport::chunked(&response, 9);

    assert_eq!(rig.run(&mut t, 64).unwrap_err(), OtaError::UnexpectedStatus(404));
    assert_eq!(rig.flash.calls, vec![FlashCall::Begin, FlashCall::Abort]);
}

#[test]
fn missing_content_length_is_malformed() {
    let mut rig = Rig::new();
    let mut t = MockTransport::chunked(b"HTTP/1.1 200 OK\r\ncontent-length: 3\r\n\r\nabc", 4);

    assert_eq!(
        rig.run(&mut t, 64).unwrap_err(),
        OtaError::HeaderMalformed(MalformedHeader::MissingContentLength)
    );
    assert!(rig.flash.image.is_empty());
    assert_eq!(rig.flash.aborts(), 1);
}

#[test]
fn oversized_image_is_refused_before_writing() {
    let mut rig = Rig::new();
    rig.config.max_image_size = 10;
    let mut t = MockTransport::chunked(&wire(&image(11)), 64);

    assert_eq!(
        rig.run(&mut t, 64).unwrap_err(),
        OtaError::ImageTooLarge { declared: 11, capacity: 10 }
    );
    assert_eq!(rig.flash.calls, vec![FlashCall::Begin, FlashCall::Abort]);
}

#[test]
fn session_deadline_times_out() {
    let mut rig = Rig::new();
    rig.config.session_timeout_secs = 30;
    let steps = std::iter::once(Step::Data(wire(&image(64))[..50].to_vec()))
        .chain((0..10).map(|_| Step::Stall(5_000)))
        .collect();
    let mut t = MockTransport::new(steps).with_clock(rig.clock.clone());

    assert_eq!(rig.run(&mut t, 64).unwrap_err(), OtaError::Timeout);
    assert_eq!(rig.flash.aborts(), 1);
    assert_eq!(t.close_calls, 1);
}

#[test]
fn socket_error_is_transport_failure() {
    let mut rig = Rig::new();
    let mut t = MockTransport::new(vec![
        Step::Data(b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\nabc".to_vec()),
        Step::Fail(TransportError::Io),
    ]);

    assert_eq!(rig.run(&mut t, 64).unwrap_err(), OtaError::TransportFailed);
    assert_eq!(rig.flash.image, b"abc");
    assert_eq!(rig.flash.aborts(), 1);
}

#[test]
fn request_write_failure_skips_flash() {
    let mut rig = Rig::new();
    let mut t = MockTransport::chunked(&wire(b"abc"), 64);
    t.fail_write = true;

    assert_eq!(rig.run(&mut t, 64).unwrap_err(), OtaError::TransportFailed);
    assert!(rig.flash.calls.is_empty());
    assert_eq!(t.close_calls, 1);
}

#[test]
fn sink_begin_failure_reads_nothing() {
    let mut rig = Rig::new();
    rig.flash.fail_begin = true;
    let mut t = MockTransport::chunked(&wire(b"abc"), 64);

    assert_eq!(rig.run(&mut t, 64).unwrap_err(), OtaError::SinkBeginFailed);
    assert_eq!(t.reads, 0);
    assert_eq!(rig.flash.aborts(), 0);
    assert_eq!(t.close_calls, 1);
}

#[test]
fn sink_write_failure_aborts() {
    let mut rig = Rig::new();
    rig.flash.fail_write_after = Some(20);
    let mut t = MockTransport::chunked(&wire(&image(64)), 16);

    assert_eq!(rig.run(&mut t, 64).unwrap_err(), OtaError::SinkWriteFailed);
    assert_eq!(rig.flash.aborts(), 1);
    assert!(!rig.flash.committed);
}

#[test]
fn sink_finish_failure_is_reported() {
    let mut rig = Rig::new();
    rig.flash.fail_finish = true;
    let mut t = MockTransport::chunked(&wire(b"abc"), 64);

    assert_eq!(rig.run(&mut t, 64).unwrap_err(), OtaError::SinkFinishFailed);
    assert_eq!(rig.flash.count(FlashCall::Finish), 1);
    assert_eq!(rig.flash.aborts(), 0);
    assert_eq!(rig.events.events.last(), Some(&OtaEvent::Failed(OtaError::SinkFinishFailed)));
}

// ── Simulation flash ──────────────────────────────────────────

#[test]
fn sim_flash_receives_image() {
    let payload = image(512);
    let config = OtaConfig::default();
    let mut flash = SimFlashSink::new(1024);
    let mut t = MockTransport::chunked(&wire(&payload), 33);
    let mut buf = [0u8; 128];

    OtaUpdater::new(&config)
        .run("user1.bin", &mut buf, &mut t, &mut flash, &ManualClock::new(), &mut RecordingSink::new())
        .unwrap();
    assert_eq!(flash.committed(), Some(&payload[..]));
}

#[test]
fn sim_flash_overflow_is_write_failure() {
    let config = OtaConfig::default();
    let mut flash = SimFlashSink::new(100);
    let mut t = MockTransport::chunked(&wire(&image(200)), 64);
    let mut buf = [0u8; 64];

    let err = OtaUpdater::new(&config)
        .run("user1.bin", &mut buf, &mut t, &mut flash, &ManualClock::new(), &mut RecordingSink::new())
        .unwrap_err();
    assert_eq!(err, OtaError::SinkWriteFailed);
    assert_eq!(flash.committed(), None);
    assert!(!flash.is_open());
}
