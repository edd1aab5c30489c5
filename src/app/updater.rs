//! OTA updater — the transport loop around [`TransferSession`].
//!
//! Flow: send GET → FlashSink::begin → N × (read → feed → write) → finish
//!
//! The updater is the only retry/recovery authority and it never retries:
//! every fatal outcome aborts the sink, closes the socket and is returned to
//! the caller, which reboots the device either way.

use log::{debug, info, warn};

use super::events::OtaEvent;
use super::ports::{Clock, EventSink, FlashSink, Transport, TransportError};
use crate::config::OtaConfig;
use crate::error::OtaError;
use crate::ota::request::build_request;
use crate::ota::session::TransferSession;

/// Summary of a committed update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReport {
    /// Image bytes written to the partition.
    pub image_bytes: u32,
    /// HTTP header bytes skipped.
    pub header_bytes: usize,
    pub elapsed_ms: u64,
}

/// Drives one download per [`run`](Self::run) call.
pub struct OtaUpdater<'c> {
    config: &'c OtaConfig,
}

impl<'c> OtaUpdater<'c> {
    pub fn new(config: &'c OtaConfig) -> Self {
        Self { config }
    }

    /// Download `image` into the inactive partition.
    ///
    /// `buf` is the receive buffer; each socket read fills at most
    /// `buf.len()` bytes. The transport is closed before returning, in
    /// every outcome.
    pub fn run<T, F, C, E>(
        &self,
        image: &str,
        buf: &mut [u8],
        transport: &mut T,
        sink: &mut F,
        clock: &C,
        events: &mut E,
    ) -> Result<UpdateReport, OtaError>
    where
        T: Transport,
        F: FlashSink,
        C: Clock,
        E: EventSink,
    {
        let result = self.attempt(image, buf, transport, sink, clock, events);
        transport.close();

        match &result {
            Ok(report) => events.emit(&OtaEvent::Completed {
                bytes: report.image_bytes,
            }),
            Err(e) => events.emit(&OtaEvent::Failed(*e)),
        }
        result
    }

    fn attempt<T, F, C, E>(
        &self,
        image: &str,
        buf: &mut [u8],
        transport: &mut T,
        sink: &mut F,
        clock: &C,
        events: &mut E,
    ) -> Result<UpdateReport, OtaError>
    where
        T: Transport,
        F: FlashSink,
        C: Clock,
        E: EventSink,
    {
        if buf.is_empty() {
            warn!("OTA: receive buffer is empty");
            return Err(OtaError::TransportFailed);
        }

        let started = clock.uptime_ms();
        let cfg = self.config;

        let request = build_request(&cfg.server_host, &cfg.firmware_path, image, &cfg.user_agent)?;
        transport.write_all(request.as_bytes()).map_err(|e| {
            warn!("OTA: sending GET request failed: {}", e);
            OtaError::TransportFailed
        })?;
        info!("OTA: requested /{}/{} from {}", cfg.firmware_path.trim_matches('/'), image, cfg.server_host);
        events.emit(&OtaEvent::RequestSent {
            bytes: request.len(),
        });

        let mut handle = sink.begin().map_err(|e| {
            warn!("OTA: sink begin failed: {}", e);
            OtaError::SinkBeginFailed
        })?;

        let session = match self.stream(buf, transport, sink, &mut handle, clock, events, started) {
            Ok(session) => session,
            Err(e) => {
                sink.abort(handle);
                warn!("OTA: aborted update partition");
                return Err(e);
            }
        };

        sink.finish(handle).map_err(|e| {
            warn!("OTA: sink finish failed: {}", e);
            OtaError::SinkFinishFailed
        })?;

        let report = UpdateReport {
            image_bytes: session.bytes_seen_total(),
            header_bytes: session.header_bytes(),
            elapsed_ms: clock.uptime_ms().saturating_sub(started),
        };
        info!(
            "OTA: committed {} bytes in {} ms",
            report.image_bytes, report.elapsed_ms
        );
        Ok(report)
    }

    /// Read until the session completes, fails, or the deadline passes.
    #[allow(clippy::too_many_arguments)]
    fn stream<T, F, C, E>(
        &self,
        buf: &mut [u8],
        transport: &mut T,
        sink: &mut F,
        handle: &mut F::Handle,
        clock: &C,
        events: &mut E,
        started: u64,
    ) -> Result<TransferSession, OtaError>
    where
        T: Transport,
        F: FlashSink,
        C: Clock,
        E: EventSink,
    {
        let mut session = TransferSession::new(self.config.session_limits());
        let deadline = started.saturating_add(self.config.session_timeout_ms());
        let mut header_announced = false;
        let mut last_decile = 0u64;

        loop {
            if clock.uptime_ms() >= deadline {
                warn!(
                    "OTA: session timed out after {} of {:?} bytes",
                    session.bytes_seen_total(),
                    session.declared_length()
                );
                return Err(OtaError::Timeout);
            }

            let n = match transport.read(buf) {
                Ok(n) => n,
                Err(TransportError::TimedOut) => {
                    debug!("OTA: read timed out, waiting for more data");
                    continue;
                }
                Err(e) => {
                    warn!("OTA: receive failed: {}", e);
                    return Err(OtaError::TransportFailed);
                }
            };
            if n == 0 {
                info!("OTA: connection closed by server");
            }

            let feed = session.feed(&buf[..n])?;

            if !header_announced {
                if let Some(content_length) = session.declared_length() {
                    header_announced = true;
                    events.emit(&OtaEvent::HeaderParsed { content_length });
                }
            }

            if !feed.payload.is_empty() {
                sink.write(handle, feed.payload).map_err(|e| {
                    warn!("OTA: sink write failed: {}", e);
                    OtaError::SinkWriteFailed
                })?;

                let written = session.bytes_seen_total();
                let total = session.declared_length().unwrap_or(written);
                let decile = u64::from(written) * 10 / u64::from(total.max(1));
                if decile > last_decile {
                    last_decile = decile;
                    events.emit(&OtaEvent::Progress { written, total });
                }
            }

            if feed.complete {
                return Ok(session);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────
