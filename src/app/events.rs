//! Structured events emitted by the updater.
//!
//! These are *output* events (updater → outside world), distinct from the
//! session's internal phase. Adapters implement
//! [`EventSink`](super::ports::EventSink) to forward them to the log or a
//! status report.

use crate::error::OtaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaEvent {
    /// The GET request went out.
    RequestSent { bytes: usize },
    /// The response header was accepted.
    HeaderParsed { content_length: u32 },
    /// Payload written so far; emitted at 10 % steps.
    Progress { written: u32, total: u32 },
    /// The image was committed and will boot next.
    Completed { bytes: u32 },
    /// The attempt ended without committing anything.
    Failed(OtaError),
}
