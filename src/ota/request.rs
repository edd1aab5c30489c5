//! Firmware GET request and update-slot selection.
//!
//! ```text
//! GET /<path>/<image> HTTP/1.1\r\n
//! Host: <server>\r\n
//! User-Agent: <agent>\r\n
//! Connection: close\r\n
//! \r\n
//! ```

use core::fmt::Write;

use crate::error::OtaError;

/// Capacity of the rendered request.
pub const MAX_REQUEST_LEN: usize = 256;

pub type Request = heapless::String<MAX_REQUEST_LEN>;

/// Render the firmware GET request. Leading/trailing `/` on `path` are ignored.
pub fn build_request(host: &str, path: &str, image: &str, user_agent: &str) -> Result<Request, OtaError> {
    let path = path.trim_matches('/');
    let mut req = Request::new();

    let rendered = if path.is_empty() {
        write!(req, "GET /{image} HTTP/1.1\r\n")
    } else {
        write!(req, "GET /{path}/{image} HTTP/1.1\r\n")
    };
    rendered
        .and_then(|()| {
            write!(
                req,
                "Host: {host}\r\nUser-Agent: {user_agent}\r\nConnection: close\r\n\r\n"
            )
        })
        .map_err(|_| OtaError::RequestTooLong)?;

    Ok(req)
}

// ── Slots ─────────────────────────────────────────────────────

/// Application partition the device is running from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaSlot {
    Factory,
    Ota0,
    Ota1,
}

impl OtaSlot {
    /// Map a partition label (`factory`, `ota_0`, `ota_1`) to a slot.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "factory" => Some(Self::Factory),
            "ota_0" => Some(Self::Ota0),
            "ota_1" => Some(Self::Ota1),
            _ => None,
        }
    }

    /// The slot an update written while running from `self` lands in.
    pub fn update_target(self) -> Self {
        match self {
            Self::Factory | Self::Ota1 => Self::Ota0,
            Self::Ota0 => Self::Ota1,
        }
    }

    /// Index into per-slot tables; `None` for the factory slot.
    pub fn ota_index(self) -> Option<usize> {
        match self {
            Self::Factory => None,
            Self::Ota0 => Some(0),
            Self::Ota1 => Some(1),
        }
    }
}
