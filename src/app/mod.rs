//! Application core — update orchestration, zero direct I/O.
//!
//! The updater drives the download and talks to the device only through
//! the **port traits** in [`ports`], so the whole flow is testable on the
//! host against mocks.

pub mod events;
pub mod ports;
pub mod updater;
