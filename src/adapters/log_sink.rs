//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing updater events to the ESP-IDF
//! logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::OtaEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`OtaEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &OtaEvent) {
        match event {
            OtaEvent::RequestSent { bytes } => {
                info!("OTA | request sent ({} bytes)", bytes);
            }
            OtaEvent::HeaderParsed { content_length } => {
                info!("OTA | header ok, image is {} bytes", content_length);
            }
            OtaEvent::Progress { written, total } => {
                let pct = u64::from(*written) * 100 / u64::from((*total).max(1));
                info!("OTA | {:>3}% ({}/{})", pct, written, total);
            }
            OtaEvent::Completed { bytes } => {
                info!("OTA | complete, {} bytes committed", bytes);
            }
            OtaEvent::Failed(e) => {
                warn!("OTA | failed: {}", e);
            }
        }
    }
}
