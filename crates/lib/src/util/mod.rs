//! Shared utilities.
//!
//! Hashing, lock helpers, path and identifier helpers used across the crate.

pub mod hash;
pub mod identifier;
pub mod path;
pub mod sync;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, saturating at zero for earlier times.
pub fn unix_millis(time: SystemTime) -> u64 {
  time.duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
  unix_millis(SystemTime::now())
}

#[cfg(test)]
pub mod testutil;
