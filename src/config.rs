//! OTA configuration parameters
//!
//! Where to fetch firmware from and how long to wait for it.
//! Defaults match the lab deployment; a build can override them with a JSON
//! document (see [`OtaConfig::from_json`]).

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::ota::header::{DEFAULT_MAX_HEADER, DEFAULT_MAX_LINE};
use crate::ota::request::OtaSlot;
use crate::ota::session::{DEFAULT_MAX_IMAGE_SIZE, SessionLimits};

/// Errors from loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid JSON for [`OtaConfig`].
    Parse,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "config is not valid JSON"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Firmware update configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtaConfig {
    // --- Server ---
    /// Update server address (IP or host name)
    pub server_host: String,
    /// Update server TCP port
    pub server_port: u16,
    /// Directory on the server holding the images
    pub firmware_path: String,
    /// Image to fetch when the update lands in OTA slot 0 / slot 1
    pub image_names: [String; 2],
    /// `User-Agent` header value
    pub user_agent: String,

    // --- Timing ---
    /// Whole-session deadline (seconds)
    pub session_timeout_secs: u32,
    /// Single socket read timeout (milliseconds)
    pub read_timeout_ms: u32,

    // --- Limits ---
    /// Longest accepted response header line (bytes)
    pub max_header_line: usize,
    /// Longest accepted response header section (bytes)
    pub max_header_len: usize,
    /// Capacity of the update partition (bytes)
    pub max_image_size: u32,
}

impl Default for OtaConfig {
    fn default() -> Self {
        Self {
            // Server
            server_host: "192.168.0.2".into(),
            server_port: 80,
            firmware_path: "esp8266_fota".into(),
            image_names: ["user1.bin".into(), "user2.bin".into()],
            user_agent: "ESP8266".into(),

            // Timing
            session_timeout_secs: 300,
            read_timeout_ms: 10_000,

            // Limits
            max_header_line: DEFAULT_MAX_LINE,
            max_header_len: DEFAULT_MAX_HEADER,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }
}

impl OtaConfig {
    /// Parse a JSON document and validate it. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make an update attempt impossible or unbounded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_host.is_empty() {
            return Err(ConfigError::ValidationFailed("server_host is empty"));
        }
        if self.firmware_path.trim_matches('/').is_empty() {
            return Err(ConfigError::ValidationFailed("firmware_path is empty"));
        }
        if self.server_port == 0 {
            return Err(ConfigError::ValidationFailed("server_port must be non-zero"));
        }
        if self.image_names.iter().any(String::is_empty) {
            return Err(ConfigError::ValidationFailed("image_names must not be empty"));
        }
        if self.session_timeout_secs == 0 || self.read_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("timeouts must be non-zero"));
        }
        if u64::from(self.read_timeout_ms) > u64::from(self.session_timeout_secs) * 1000 {
            return Err(ConfigError::ValidationFailed(
                "read_timeout_ms exceeds session timeout",
            ));
        }
        if self.max_header_line == 0 || self.max_header_line > self.max_header_len {
            return Err(ConfigError::ValidationFailed(
                "max_header_line must be in 1..=max_header_len",
            ));
        }
        if self.max_image_size == 0 {
            return Err(ConfigError::ValidationFailed("max_image_size must be non-zero"));
        }
        Ok(())
    }

    /// Image to download while running from `running`.
    pub fn image_for(&self, running: OtaSlot) -> &str {
        let index = running.update_target().ota_index().unwrap_or(0);
        &self.image_names[index]
    }

    /// Session deadline in milliseconds.
    pub fn session_timeout_ms(&self) -> u64 {
        u64::from(self.session_timeout_secs) * 1000
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            max_header_line: self.max_header_line,
            max_header_len: self.max_header_len,
            max_image_size: self.max_image_size,
        }
    }
}
