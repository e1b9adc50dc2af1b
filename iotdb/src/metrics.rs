//! Prometheus metrics for adapter operations

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

// ── Operation metrics ────────────────────────────────────────────────────────

pub static OPERATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tsbench_operations_total",
        "Adapter operations by outcome",
        &["operation", "status"]
    )
    .unwrap()
});

pub static POINTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tsbench_points_total",
        "Points written or read by successful operations",
        &["operation"]
    )
    .unwrap()
});

pub static OPERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "tsbench_operation_duration_seconds",
        "Adapter operation latency",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap()
});

/// Record the outcome of one operation
pub fn observe(operation: &str, success: bool, points: u64, elapsed_secs: f64) {
    let status = if success { "ok" } else { "error" };
    OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
    if success {
        POINTS_TOTAL
            .with_label_values(&[operation])
            .inc_by(points as f64);
    }
    OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(elapsed_secs);
}

/// Encode all registered metrics in Prometheus text format
pub fn encode_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}
