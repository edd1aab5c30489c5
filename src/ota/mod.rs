//! HTTP OTA download core.
//!
//! Pure protocol logic, zero I/O: the updater in [`crate::app::updater`]
//! owns the socket and the flash sink and drives a [`TransferSession`]
//! with whatever the socket returns.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  socket read ──▶ TransferSession::feed                   │
//! │                    │                                     │
//! │                    ├─ AwaitingHeader ─▶ HeaderParser     │
//! │                    │                     └─▶ scanner     │
//! │                    └─ Streaming ──▶ payload slice        │
//! │                                        └─▶ FlashSink     │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod header;
pub mod request;
pub mod scanner;
pub mod session;

pub use header::{HeaderParser, HeaderScanResult};
pub use request::{OtaSlot, build_request};
pub use session::{Feed, PhaseId, SessionLimits, TransferSession};
