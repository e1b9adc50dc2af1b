//! Query shapes issued by a benchmark workload
//!
//! Every query names at least one device. Multi-device queries assume all
//! devices share the sensor layout of the first one: select lists are built
//! from `devices[0]` and matched positionally.

use crate::types::record::Record;
use crate::types::schema::DeviceSchema;

/// Q1: values of all sensors at one timestamp
#[derive(Debug, Clone)]
pub struct PreciseQuery {
    pub devices: Vec<DeviceSchema>,
    pub timestamp: i64,
}

/// Q2: raw values in the inclusive range `[start, end]`
#[derive(Debug, Clone)]
pub struct RangeQuery {
    pub devices: Vec<DeviceSchema>,
    pub start: i64,
    pub end: i64,
}

/// Q3: raw values in `[start, end]` whose sensors exceed a threshold
#[derive(Debug, Clone)]
pub struct ValueRangeQuery {
    pub devices: Vec<DeviceSchema>,
    pub start: i64,
    pub end: i64,
    pub value_threshold: f64,
}

/// Q4: aggregate over the inclusive range `[start, end]`
#[derive(Debug, Clone)]
pub struct AggRangeQuery {
    pub devices: Vec<DeviceSchema>,
    pub agg_fun: String,
    pub start: i64,
    pub end: i64,
}

/// Q5: aggregate over values exceeding a threshold
#[derive(Debug, Clone)]
pub struct AggValueQuery {
    pub devices: Vec<DeviceSchema>,
    pub agg_fun: String,
    pub value_threshold: f64,
}

/// Q6: aggregate over `[start, end]` and values exceeding a threshold
#[derive(Debug, Clone)]
pub struct AggRangeValueQuery {
    pub devices: Vec<DeviceSchema>,
    pub agg_fun: String,
    pub start: i64,
    pub end: i64,
    pub value_threshold: f64,
}

/// Q7: aggregate per time bucket over the half-open range `[start, end)`
#[derive(Debug, Clone)]
pub struct GroupByQuery {
    pub devices: Vec<DeviceSchema>,
    pub agg_fun: String,
    pub start: i64,
    pub end: i64,
    pub granularity_ms: u64,
}

/// Q8: most recent value of every sensor
#[derive(Debug, Clone)]
pub struct LatestPointQuery {
    pub devices: Vec<DeviceSchema>,
}

/// Rows of one device in `[start, end)`, newest first. Also the subject of
/// device summaries.
#[derive(Debug, Clone)]
pub struct DeviceQuery {
    pub device: DeviceSchema,
    pub start: i64,
    pub end: i64,
}

/// Read back previously written records of one device and compare them
#[derive(Debug, Clone)]
pub struct VerificationQuery {
    pub device: DeviceSchema,
    pub records: Vec<Record>,
}
