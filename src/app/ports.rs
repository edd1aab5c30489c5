//! Port traits — the hexagonal boundary between the update logic and the device.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ OtaUpdater (domain)
//! ```
//!
//! The flash partition, the socket, the clock and the diagnostics channel
//! are all reached through these traits. The [`OtaUpdater`](super::updater::OtaUpdater)
//! consumes them via generics, so the download path runs unchanged against
//! ESP-IDF, a host TCP socket, or in-memory mocks.

use core::fmt;

use super::events::OtaEvent;

// ───────────────────────────────────────────────────────────────
// Flash sink (driven adapter: domain → inactive partition)
// ───────────────────────────────────────────────────────────────

/// Append-only writer for the inactive firmware partition.
///
/// Exactly one of [`finish`](Self::finish) or [`abort`](Self::abort) is
/// called for every handle returned by [`begin`](Self::begin).
pub trait FlashSink {
    /// An open update on the target partition.
    type Handle;

    /// Open (and erase as needed) the inactive partition.
    fn begin(&mut self) -> Result<Self::Handle, SinkError>;

    /// Append `data`. Slices arrive in download order.
    fn write(&mut self, handle: &mut Self::Handle, data: &[u8]) -> Result<(), SinkError>;

    /// Verify the image and mark the partition as the next boot target.
    fn finish(&mut self, handle: Self::Handle) -> Result<(), SinkError>;

    /// Release the partition without committing anything.
    fn abort(&mut self, handle: Self::Handle);
}

// ───────────────────────────────────────────────────────────────
// Transport (driven adapter: domain ↔ update server)
// ───────────────────────────────────────────────────────────────

/// Blocking byte stream to the update server.
pub trait Transport {
    /// Read up to `buf.len()` bytes. `Ok(0)` means the peer closed.
    ///
    /// Implementations with a read timeout return
    /// [`TransportError::TimedOut`] when nothing arrived in time.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Close the connection. Idempotent.
    fn close(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock (driven adapter: monotonic time)
// ───────────────────────────────────────────────────────────────

pub trait Clock {
    /// Milliseconds since boot (monotonic).
    fn uptime_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The updater emits structured [`OtaEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &OtaEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`FlashSink`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// No inactive OTA partition exists.
    NoPartition,
    /// The update is already open or the handle is stale.
    Busy,
    /// The write would run past the end of the partition.
    OutOfSpace,
    /// Flash erase or program failed.
    Flash,
    /// The written image failed verification.
    Verify,
    /// Boot partition metadata could not be updated.
    BootSelect,
}

/// Errors from [`Transport`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No data arrived within the read timeout.
    TimedOut,
    /// The connection is not open.
    NotConnected,
    /// Any other socket failure.
    Io,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPartition => write!(f, "no inactive OTA partition"),
            Self::Busy => write!(f, "update partition busy"),
            Self::OutOfSpace => write!(f, "image exceeds partition"),
            Self::Flash => write!(f, "flash erase/program failed"),
            Self::Verify => write!(f, "image verification failed"),
            Self::BootSelect => write!(f, "set boot partition failed"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut => write!(f, "read timed out"),
            Self::NotConnected => write!(f, "not connected"),
            Self::Io => write!(f, "socket I/O error"),
        }
    }
}
