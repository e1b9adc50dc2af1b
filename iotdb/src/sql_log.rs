//! SQL and schema event logging.
//!
//! Executed statements, tolerated registration failures and verification
//! mismatches are emitted via `tracing` under a dedicated target so they can
//! be filtered apart from the rest of the adapter's output.

use tracing::{info, warn};

pub const SQL_TARGET: &str = "tsbench::sql";

/// Log one executed query. Suppressed entirely in quiet mode.
pub fn query(operation: &str, sql: &str, quiet: bool) {
    if quiet {
        return;
    }
    info!(
        target: SQL_TARGET,
        event = "query",
        operation = %operation,
        sql = %sql,
    );
}

/// Log a registration statement rejected because the object already exists.
pub fn already_exists(sql: &str, reason: &str) {
    info!(
        target: SQL_TARGET,
        event = "already_exists",
        sql = %sql,
        reason = %reason,
    );
}

/// Log a cleanup statement that found nothing to delete.
pub fn cleanup_skipped(sql: &str, reason: &str) {
    warn!(
        target: SQL_TARGET,
        event = "cleanup_skipped",
        sql = %sql,
        reason = %reason,
    );
}

/// Log a verification read whose line count differs from the records sent.
pub fn verification_mismatch(sql: &str, expected: usize, actual: usize) {
    warn!(
        target: SQL_TARGET,
        event = "verification_mismatch",
        sql = %sql,
        expected = expected,
        actual = actual,
    );
}

/// Log a returned value that differs from the value written.
pub fn value_mismatch(timestamp: i64, expected: &str, actual: &str) {
    warn!(
        target: SQL_TARGET,
        event = "value_mismatch",
        timestamp = timestamp,
        expected = %expected,
        actual = %actual,
    );
}
