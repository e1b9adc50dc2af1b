//! Query text generation
//!
//! Every query shape is assembled from the same pieces: a select head, the
//! model's `FROM` clause, and a chain of predicates. [`Select`] tracks
//! whether a `WHERE` has been emitted yet, so the table model's device
//! filter and the value filter never produce a double conjunction.

use crate::error::AdapterError;
use crate::model::{agg_list, ModelStrategy, AND, WHERE};
use std::collections::HashMap;
use tsbench_shared::{
    AggRangeQuery, AggRangeValueQuery, AggValueQuery, DeviceQuery, DeviceSchema, GroupByQuery,
    LatestPointQuery, PreciseQuery, RangeQuery, ValueRangeQuery, Value, VerificationQuery,
};

const ORDER_BY_TIME_DESC: &str = " ORDER BY time DESC";

/// A verification query and the values it is expected to read back
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub sql: String,
    /// Expected sensor values keyed by timestamp
    pub expected: HashMap<i64, Vec<Option<Value>>>,
}

/// The three queries summarising one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryQueries {
    pub count: String,
    pub min_time: String,
    pub max_time: String,
}

/// Builds query text for one data model.
///
/// Shapes are rendered as given: arguments are expected to have passed
/// [`check_devices`] and, for value filters, [`check_threshold`].
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    model: ModelStrategy,
}

impl QueryBuilder {
    pub fn new(model: ModelStrategy) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ModelStrategy {
        &self.model
    }

    /// `SELECT <sensors> FROM <devices> WHERE time = T`
    pub fn precise(&self, query: &PreciseQuery) -> String {
        self.simple(&query.devices)
            .and(&format!("time = {}", query.timestamp))
            .finish()
    }

    /// Inclusive on both ends
    pub fn range(&self, query: &RangeQuery) -> String {
        self.range_select(&query.devices, query.start, query.end)
            .finish()
    }

    pub fn range_desc(&self, query: &RangeQuery) -> String {
        self.range_select(&query.devices, query.start, query.end)
            .push(ORDER_BY_TIME_DESC)
            .finish()
    }

    pub fn value_range(&self, query: &ValueRangeQuery) -> String {
        self.value_range_select(query).finish()
    }

    pub fn value_range_desc(&self, query: &ValueRangeQuery) -> String {
        self.value_range_select(query)
            .push(ORDER_BY_TIME_DESC)
            .finish()
    }

    pub fn agg_range(&self, query: &AggRangeQuery) -> String {
        self.aggregate(&query.devices, &query.agg_fun)
            .and(&time_range(query.start, query.end))
            .finish()
    }

    /// The value filter opens the `WHERE` clause unless a device filter did
    pub fn agg_value(&self, query: &AggValueQuery) -> String {
        self.aggregate(&query.devices, &query.agg_fun)
            .value_filter(&self.model, &query.devices, query.value_threshold)
            .finish()
    }

    pub fn agg_range_value(&self, query: &AggRangeValueQuery) -> String {
        self.aggregate(&query.devices, &query.agg_fun)
            .and(&time_range(query.start, query.end))
            .value_filter(&self.model, &query.devices, query.value_threshold)
            .finish()
    }

    /// Bucketed aggregation over the half-open range `[start, end)`
    pub fn group_by(&self, query: &GroupByQuery) -> String {
        self.model.group_by(
            &query.devices,
            &query.agg_fun,
            query.start,
            query.end,
            query.granularity_ms,
        )
    }

    pub fn group_by_desc(&self, query: &GroupByQuery) -> String {
        format!("{}{}", self.group_by(query), ORDER_BY_TIME_DESC)
    }

    pub fn latest_point(&self, query: &LatestPointQuery) -> String {
        let head = format!("SELECT {}", self.model.latest_select_list(&query.devices));
        Select::new(&self.model, head, &query.devices).finish()
    }

    /// Rows of one device in `[start, end)`, newest first. The exclusive
    /// upper bound differs from [`QueryBuilder::range`] on purpose.
    pub fn device_query(&self, query: &DeviceQuery) -> String {
        let devices = std::slice::from_ref(&query.device);
        self.simple(devices)
            .and(&format!("time >= {} AND time < {}", query.start, query.end))
            .push(ORDER_BY_TIME_DESC)
            .finish()
    }

    /// One exact-timestamp predicate per expected record, plus the expected
    /// values keyed by timestamp
    pub fn verification(&self, query: &VerificationQuery) -> Result<Verification, AdapterError> {
        if query.records.is_empty() {
            return Err(AdapterError::EmptyVerification);
        }

        let devices = std::slice::from_ref(&query.device);
        let select = self.simple(devices);
        let disjunction = query
            .records
            .iter()
            .map(|record| format!("time = {}", record.timestamp))
            .collect::<Vec<_>>()
            .join(" OR ");
        // a device filter binds tighter than OR
        let predicate = if select.has_where {
            format!("({})", disjunction)
        } else {
            disjunction
        };

        let expected = query
            .records
            .iter()
            .map(|record| (record.timestamp, record.values.clone()))
            .collect();

        Ok(Verification {
            sql: select.and(&predicate).finish(),
            expected,
        })
    }

    pub fn summary(&self, device: &DeviceSchema) -> SummaryQueries {
        let devices = std::slice::from_ref(device);
        let all = || Select::new(&self.model, "SELECT *".to_string(), devices);
        SummaryQueries {
            count: Select::new(&self.model, "SELECT COUNT(*)".to_string(), devices).finish(),
            min_time: all().push(" ORDER BY time LIMIT 1").finish(),
            max_time: all().push(" ORDER BY time DESC LIMIT 1").finish(),
        }
    }

    fn simple(&self, devices: &[DeviceSchema]) -> Select {
        let head = format!("SELECT {}", self.model.select_list(devices));
        Select::new(&self.model, head, devices)
    }

    fn aggregate(&self, devices: &[DeviceSchema], agg_fun: &str) -> Select {
        let head = format!("SELECT {}", agg_list(devices, agg_fun));
        Select::new(&self.model, head, devices)
    }

    fn range_select(&self, devices: &[DeviceSchema], start: i64, end: i64) -> Select {
        self.simple(devices).and(&time_range(start, end))
    }

    fn value_range_select(&self, query: &ValueRangeQuery) -> Select {
        self.range_select(&query.devices, query.start, query.end)
            .value_filter(&self.model, &query.devices, query.value_threshold)
    }
}

/// A query names at least one device
pub fn check_devices(devices: &[DeviceSchema]) -> Result<(), AdapterError> {
    if devices.is_empty() {
        return Err(AdapterError::InvalidQuery("no devices to query".to_string()));
    }
    Ok(())
}

/// A value filter threshold must render as a SQL number
pub fn check_threshold(threshold: f64) -> Result<(), AdapterError> {
    if !threshold.is_finite() {
        return Err(AdapterError::InvalidQuery(format!(
            "value threshold {} is not a finite number",
            threshold
        )));
    }
    Ok(())
}

fn time_range(start: i64, end: i64) -> String {
    format!("time >= {} AND time <= {}", start, end)
}

/// Query text under construction
struct Select {
    sql: String,
    has_where: bool,
}

impl Select {
    fn new(model: &ModelStrategy, head: String, devices: &[DeviceSchema]) -> Self {
        let mut select = Self {
            sql: head,
            has_where: false,
        };
        select.sql.push_str(&model.from_clause(devices));
        match model.device_filter(devices) {
            Some(filter) => select.and(&filter),
            None => select,
        }
    }

    fn and(mut self, predicate: &str) -> Self {
        self.sql.push_str(if self.has_where { AND } else { WHERE });
        self.sql.push_str(predicate);
        self.has_where = true;
        self
    }

    fn value_filter(mut self, model: &ModelStrategy, devices: &[DeviceSchema], threshold: f64) -> Self {
        let clause = model.value_filter_clause(devices, threshold, !self.has_where);
        self.sql.push_str(&clause);
        self.has_where = true;
        self
    }

    fn push(mut self, suffix: &str) -> Self {
        self.sql.push_str(suffix);
        self
    }

    fn finish(self) -> String {
        self.sql
    }
}
