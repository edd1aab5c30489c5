//! OTA transfer state machine.
//!
//! Flow: AwaitingHeader → Streaming → Complete (or Failed from any phase)
//!
//! The session is fed raw socket reads in arrival order and answers, for
//! each read, which sub-slice is firmware payload for the flash sink. It
//! never copies or buffers bytes; all phase data is scalar.
//!
//! ```text
//!   chunk ──▶ feed() ──┬── header bytes  → HeaderParser (dropped)
//!                      ├── payload bytes → Feed::payload (to FlashSink)
//!                      └── past-the-end  → discarded
//! ```
//!
//! A zero-length chunk means the peer closed the connection. It is only a
//! success when every declared byte has already been delivered.

use log::{debug, info, warn};

use super::header::{DEFAULT_MAX_HEADER, DEFAULT_MAX_LINE, HeaderParser, HeaderScanResult};
use crate::error::OtaError;

/// Upper bound for an image when no partition size is known (4 MB).
pub const DEFAULT_MAX_IMAGE_SIZE: u32 = 4 * 1024 * 1024;

/// Per-session parsing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_header_line: usize,
    pub max_header_len: usize,
    /// Capacity of the update partition.
    pub max_image_size: u32,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_header_line: DEFAULT_MAX_LINE,
            max_header_len: DEFAULT_MAX_HEADER,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }
}

/// Observable phase of a [`TransferSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseId {
    AwaitingHeader,
    Streaming,
    Complete,
    Failed,
}

#[derive(Debug, Clone)]
enum Phase {
    AwaitingHeader(HeaderParser),
    Streaming { declared_length: u32, bytes_seen: u32 },
    Complete { declared_length: u32 },
    /// Counters are frozen at the point of failure.
    Failed {
        reason: OtaError,
        declared_length: Option<u32>,
        bytes_seen: u32,
    },
}

/// Result of one successful [`TransferSession::feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feed<'a> {
    /// Payload bytes of this chunk, in order, to hand to the sink.
    pub payload: &'a [u8],
    /// All declared bytes have now been delivered.
    pub complete: bool,
}

impl Feed<'_> {
    const fn empty(complete: bool) -> Self {
        Self {
            payload: &[],
            complete,
        }
    }
}

/// One OTA download, from the first response byte to the last image byte.
#[derive(Debug, Clone)]
pub struct TransferSession {
    phase: Phase,
    limits: SessionLimits,
    header_bytes: usize,
}

impl TransferSession {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            phase: Phase::AwaitingHeader(HeaderParser::new(
                limits.max_header_line,
                limits.max_header_len,
            )),
            limits,
            header_bytes: 0,
        }
    }

    /// Consume one socket read. An empty `chunk` signals connection close.
    ///
    /// Returns the payload sub-slice of `chunk`. Header bytes and bytes past
    /// the declared length are never part of it. Once the session has
    /// failed, every later call returns the same error.
    pub fn feed<'a>(&mut self, chunk: &'a [u8]) -> Result<Feed<'a>, OtaError> {
        let mut rest = chunk;

        if let Phase::AwaitingHeader(parser) = &mut self.phase {
            if chunk.is_empty() {
                warn!("OTA: connection closed inside HTTP header");
                return self.fail(OtaError::TransportClosedEarly);
            }

            match parser.scan(chunk) {
                HeaderScanResult::NeedMoreData => {
                    self.header_bytes = parser.scanned();
                    return Ok(Feed::empty(false));
                }
                HeaderScanResult::Malformed(reason) => {
                    self.header_bytes = parser.scanned();
                    return self.fail(reason.into());
                }
                HeaderScanResult::HeaderComplete {
                    header_byte_length,
                    content_length,
                } => {
                    self.header_bytes = parser.scanned();
                    let status = parser.status_code();
                    self.begin_payload(status, content_length)?;
                    rest = &chunk[header_byte_length..];
                    if rest.is_empty() {
                        return Ok(Feed::empty(self.is_complete()));
                    }
                }
            }
        }

        match &mut self.phase {
            Phase::Streaming {
                declared_length,
                bytes_seen,
            } => {
                let declared = *declared_length;
                if rest.is_empty() {
                    warn!(
                        "OTA: connection closed after {}/{} payload bytes",
                        bytes_seen, declared
                    );
                    return self.fail(OtaError::TransportClosedEarly);
                }

                let remaining = (declared - *bytes_seen) as usize;
                let take = rest.len().min(remaining);
                *bytes_seen += take as u32;

                let complete = *bytes_seen == declared;
                if complete {
                    if rest.len() > take {
                        debug!("OTA: dropping {} bytes past end of image", rest.len() - take);
                    }
                    info!("OTA: received complete image ({} bytes)", declared);
                    self.phase = Phase::Complete {
                        declared_length: declared,
                    };
                }

                Ok(Feed {
                    payload: &rest[..take],
                    complete,
                })
            }
            Phase::Complete { .. } => Ok(Feed::empty(true)),
            Phase::Failed { reason, .. } => Err(*reason),
            // Only reachable through the header branch above, which either
            // returns or leaves this phase.
            Phase::AwaitingHeader(_) => Ok(Feed::empty(false)),
        }
    }

    /// Leave the header phase once the blank line has been seen.
    fn begin_payload(&mut self, status: Option<u16>, content_length: u32) -> Result<(), OtaError> {
        if let Some(code) = status {
            if !(200..300).contains(&code) {
                warn!("OTA: server answered HTTP {}", code);
                return self.fail(OtaError::UnexpectedStatus(code));
            }
        }

        if content_length > self.limits.max_image_size {
            warn!(
                "OTA: image of {} bytes exceeds capacity {}",
                content_length, self.limits.max_image_size
            );
            return self.fail(OtaError::ImageTooLarge {
                declared: content_length,
                capacity: self.limits.max_image_size,
            });
        }

        info!(
            "OTA: parsed Content-Length {} after {} header bytes",
            content_length, self.header_bytes
        );

        self.phase = if content_length == 0 {
            Phase::Complete { declared_length: 0 }
        } else {
            Phase::Streaming {
                declared_length: content_length,
                bytes_seen: 0,
            }
        };
        Ok(())
    }

    fn fail<T>(&mut self, e: OtaError) -> Result<T, OtaError> {
        warn!("OTA: transfer failed: {}", e);
        self.phase = Phase::Failed {
            reason: e,
            declared_length: self.declared_length(),
            bytes_seen: self.bytes_seen_total(),
        };
        Err(e)
    }

    // ── Observers ─────────────────────────────────────────────

    pub fn phase(&self) -> PhaseId {
        match self.phase {
            Phase::AwaitingHeader(_) => PhaseId::AwaitingHeader,
            Phase::Streaming { .. } => PhaseId::Streaming,
            Phase::Complete { .. } => PhaseId::Complete,
            Phase::Failed { .. } => PhaseId::Failed,
        }
    }

    /// `Content-Length` of the image, once the header has been parsed.
    pub fn declared_length(&self) -> Option<u32> {
        match self.phase {
            Phase::Streaming {
                declared_length, ..
            }
            | Phase::Complete { declared_length } => Some(declared_length),
            Phase::Failed {
                declared_length, ..
            } => declared_length,
            Phase::AwaitingHeader(_) => None,
        }
    }

    /// Payload bytes handed out so far.
    pub fn bytes_seen_total(&self) -> u32 {
        match self.phase {
            Phase::Streaming { bytes_seen, .. } => bytes_seen,
            Phase::Complete { declared_length } => declared_length,
            Phase::Failed { bytes_seen, .. } => bytes_seen,
            Phase::AwaitingHeader(_) => 0,
        }
    }

    /// Payload bytes still expected while streaming; zero in every other phase.
    pub fn remaining(&self) -> u32 {
        match self.phase {
            Phase::Streaming {
                declared_length,
                bytes_seen,
            } => declared_length - bytes_seen,
            _ => 0,
        }
    }

    /// Header bytes consumed so far.
    pub fn header_bytes(&self) -> usize {
        self.header_bytes
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.phase, Phase::Complete { .. })
    }

    pub fn failure(&self) -> Option<OtaError> {
        match self.phase {
            Phase::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl Default for TransferSession {
    fn default() -> Self {
        Self::new(SessionLimits::default())
    }
}

// ── Tests ─────────────────────────────────────────────────────
