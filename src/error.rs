//! Error types for the OTA firmware-transfer path.
//!
//! Every fatal outcome of an update attempt funnels into [`OtaError`]. All
//! variants are `Copy` so the transfer session can keep its terminal reason
//! and hand it back on every later `feed` without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Header errors
// ---------------------------------------------------------------------------

/// Why an HTTP response header was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedHeader {
    /// The blank line arrived before any `Content-Length` field.
    MissingContentLength,
    /// A single header line exceeded the configured line limit.
    LineTooLong,
    /// The header section exceeded the configured total limit.
    HeaderTooLong,
    /// The `Content-Length` value does not fit in 32 bits.
    LengthOverflow,
}

impl fmt::Display for MalformedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingContentLength => write!(f, "header ended without Content-Length"),
            Self::LineTooLong => write!(f, "header line too long"),
            Self::HeaderTooLong => write!(f, "header section too long"),
            Self::LengthOverflow => write!(f, "Content-Length value overflows u32"),
        }
    }
}

// ---------------------------------------------------------------------------
// OTA session errors
// ---------------------------------------------------------------------------

/// Fatal outcome of an OTA attempt. None of these are retried in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    /// The response header could not be parsed.
    HeaderMalformed(MalformedHeader),
    /// The server answered with a non-2xx status line.
    UnexpectedStatus(u16),
    /// The declared image does not fit the update partition.
    ImageTooLarge { declared: u32, capacity: u32 },
    /// The peer closed the connection before the full image arrived.
    TransportClosedEarly,
    /// A socket read or write failed.
    TransportFailed,
    /// The GET request did not fit the request buffer.
    RequestTooLong,
    /// The flash sink could not open the update partition.
    SinkBeginFailed,
    /// The flash sink rejected a payload write.
    SinkWriteFailed,
    /// Committing the image or selecting the boot partition failed.
    SinkFinishFailed,
    /// No terminal state was reached before the session deadline.
    Timeout,
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderMalformed(e) => write!(f, "malformed HTTP header: {e}"),
            Self::UnexpectedStatus(code) => write!(f, "unexpected HTTP status {code}"),
            Self::ImageTooLarge { declared, capacity } => {
                write!(f, "image of {declared} bytes exceeds partition capacity {capacity}")
            }
            Self::TransportClosedEarly => write!(f, "connection closed before payload complete"),
            Self::TransportFailed => write!(f, "socket I/O failed"),
            Self::RequestTooLong => write!(f, "GET request exceeds request buffer"),
            Self::SinkBeginFailed => write!(f, "OTA begin failed"),
            Self::SinkWriteFailed => write!(f, "OTA write failed"),
            Self::SinkFinishFailed => write!(f, "OTA finish failed"),
            Self::Timeout => write!(f, "OTA session timed out"),
        }
    }
}

impl From<MalformedHeader> for OtaError {
    fn from(e: MalformedHeader) -> Self {
        Self::HeaderMalformed(e)
    }
}

impl std::error::Error for OtaError {}
