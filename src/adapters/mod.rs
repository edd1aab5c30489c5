//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements | Connects to                      |
//! |------------|------------|----------------------------------|
//! | `flash`    | FlashSink  | ESP-IDF OTA partition / in-memory|
//! | `log_sink` | EventSink  | Serial log output                |
//! | `tcp`      | Transport  | Update server over TCP           |
//! | `time`     | Clock      | ESP32 system timer / `Instant`   |

pub mod flash;
pub mod log_sink;
pub mod tcp;
pub mod time;
