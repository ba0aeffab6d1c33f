//! # esp32m-sync
//!
//! Keeps device configuration sections in sync with a remote device.
//!
//! Full states coming from the device are normalized with the struct
//! codec; local edits are turned into compact position-keyed diffs and
//! handed to the transport as [`SyncEvent`]s. The transport itself
//! (WebSocket, MQTT, serial) is not part of this crate.

pub mod debounce;
pub mod rate_limiter;
pub mod sync;

pub use debounce::Debouncer;
pub use rate_limiter::RateLimiter;
pub use sync::{ConfigSync, OutgoingDiff, SyncConfig, SyncError, SyncEvent};
