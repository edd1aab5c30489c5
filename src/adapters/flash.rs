//! Flash partition adapter.
//!
//! Implements [`FlashSink`] on top of the inactive OTA app partition.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_ota::OtaUpdate` (erase on begin,
//!   sequential writes, image verification on finalize, boot partition
//!   switch).
//! - **all other targets**: an in-memory partition of fixed capacity for
//!   host-side tests and simulation.

use log::{info, warn};

use crate::app::ports::{FlashSink, SinkError};
use crate::ota::request::OtaSlot;

// ───────────────────────────────────────────────────────────────
// ESP-IDF sink
// ───────────────────────────────────────────────────────────────

/// Writes the downloaded image into the next OTA partition.
#[cfg(target_os = "espidf")]
pub struct EspOtaSink {
    written: u32,
}

#[cfg(target_os = "espidf")]
impl EspOtaSink {
    pub fn new() -> Self {
        Self { written: 0 }
    }
}

#[cfg(target_os = "espidf")]
impl Default for EspOtaSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl FlashSink for EspOtaSink {
    type Handle = esp_ota::OtaUpdate;

    fn begin(&mut self) -> Result<Self::Handle, SinkError> {
        let update = esp_ota::OtaUpdate::begin().map_err(|e| {
            warn!("esp-ota begin failed: {:?}", e);
            SinkError::NoPartition
        })?;
        self.written = 0;
        info!("OTA: update partition opened");
        Ok(update)
    }

    fn write(&mut self, handle: &mut Self::Handle, data: &[u8]) -> Result<(), SinkError> {
        handle.write(data).map_err(|e| {
            warn!("esp-ota write failed at {}: {:?}", self.written, e);
            SinkError::Flash
        })?;
        self.written = self.written.saturating_add(data.len() as u32);
        Ok(())
    }

    fn finish(&mut self, handle: Self::Handle) -> Result<(), SinkError> {
        let mut completed = handle.finalize().map_err(|e| {
            warn!("esp-ota finalize failed: {:?}", e);
            SinkError::Verify
        })?;
        completed.set_as_boot_partition().map_err(|e| {
            warn!("esp-ota set_as_boot_partition failed: {:?}", e);
            SinkError::BootSelect
        })?;
        info!("OTA: {} bytes verified, boot partition switched", self.written);
        Ok(())
    }

    fn abort(&mut self, handle: Self::Handle) {
        // esp-ota aborts the update when the handle is dropped
        drop(handle);
        warn!("OTA: update aborted after {} bytes", self.written);
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation sink
// ───────────────────────────────────────────────────────────────

/// In-memory stand-in for the inactive partition.
#[cfg(not(target_os = "espidf"))]
pub struct SimFlashSink {
    capacity: usize,
    staging: Vec<u8>,
    generation: u32,
    open: bool,
    committed: Option<Vec<u8>>,
}

/// Handle for [`SimFlashSink`]; carries the generation it was opened with.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug)]
pub struct SimHandle(u32);

#[cfg(not(target_os = "espidf"))]
impl SimFlashSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            staging: Vec::new(),
            generation: 0,
            open: false,
            committed: None,
        }
    }

    /// Bytes written by the open (or last aborted) update.
    pub fn written(&self) -> &[u8] {
        &self.staging
    }

    /// Image marked for the next boot, if any.
    pub fn committed(&self) -> Option<&[u8]> {
        self.committed.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn check(&self, handle: &SimHandle) -> Result<(), SinkError> {
        if self.open && handle.0 == self.generation {
            Ok(())
        } else {
            Err(SinkError::Busy)
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl FlashSink for SimFlashSink {
    type Handle = SimHandle;

    fn begin(&mut self) -> Result<SimHandle, SinkError> {
        if self.open {
            return Err(SinkError::Busy);
        }
        if self.capacity == 0 {
            return Err(SinkError::NoPartition);
        }
        self.generation = self.generation.wrapping_add(1);
        self.open = true;
        self.staging.clear();
        info!("OTA(sim): partition opened ({} bytes)", self.capacity);
        Ok(SimHandle(self.generation))
    }

    fn write(&mut self, handle: &mut SimHandle, data: &[u8]) -> Result<(), SinkError> {
        self.check(handle)?;
        if self.staging.len() + data.len() > self.capacity {
            return Err(SinkError::OutOfSpace);
        }
        self.staging.extend_from_slice(data);
        Ok(())
    }

    fn finish(&mut self, handle: SimHandle) -> Result<(), SinkError> {
        self.check(&handle)?;
        self.open = false;
        if self.staging.is_empty() {
            return Err(SinkError::Verify);
        }
        self.committed = Some(self.staging.clone());
        info!("OTA(sim): committed {} bytes", self.staging.len());
        Ok(())
    }

    fn abort(&mut self, handle: SimHandle) {
        if self.check(&handle).is_ok() {
            self.open = false;
            warn!("OTA(sim): aborted after {} bytes", self.staging.len());
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Boot helpers
// ───────────────────────────────────────────────────────────────

/// Mark the running firmware as valid so the bootloader keeps it.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!("OTA: firmware marked valid (rollback cancelled)"),
        Err(e) => warn!("OTA: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    info!("OTA rollback check (simulation): skipped");
}

/// Partition the firmware is executing from, and the one the bootloader
/// will pick next. They differ after an unapplied update or a rollback.
#[cfg(target_os = "espidf")]
pub fn partitions() -> (Option<OtaSlot>, Option<OtaSlot>) {
    use esp_idf_svc::sys::{esp_ota_get_boot_partition, esp_ota_get_running_partition, esp_partition_t};

    fn slot(partition: *const esp_partition_t) -> Option<OtaSlot> {
        if partition.is_null() {
            return None;
        }
        // SAFETY: non-null partition pointers from esp_ota_* point into the
        // static partition table, whose labels are NUL-terminated.
        let label = unsafe { core::ffi::CStr::from_ptr((*partition).label.as_ptr()) };
        OtaSlot::from_label(label.to_str().ok()?)
    }

    // SAFETY: both calls only read the partition table.
    unsafe { (slot(esp_ota_get_running_partition()), slot(esp_ota_get_boot_partition())) }
}

#[cfg(not(target_os = "espidf"))]
pub fn partitions() -> (Option<OtaSlot>, Option<OtaSlot>) {
    (Some(OtaSlot::Factory), Some(OtaSlot::Factory))
}

/// Soft-reset the chip.
#[cfg(target_os = "espidf")]
pub fn restart() -> ! {
    info!("OTA: restarting");
    esp_ota::restart();
}

#[cfg(not(target_os = "espidf"))]
pub fn restart() -> ! {
    panic!("restart (simulation — no real hardware reset)");
}

// ── Tests ─────────────────────────────────────────────────────
