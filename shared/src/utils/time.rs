//! Time-related utilities

use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current system time in milliseconds since UNIX epoch
pub fn system_time_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Convert a nanosecond duration to fractional seconds
pub fn nanos_to_secs(nanos: u128) -> f64 {
    nanos as f64 / 1_000_000_000.0
}
