//! Outcome of one adapter operation

use crate::error::AdapterError;
use std::fmt;
use tsbench_shared::Row;

/// Operation an outcome belongs to, used for logging and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Ingestion,
    PreciseQuery,
    RangeQuery,
    ValueRangeQuery,
    AggRangeQuery,
    AggValueQuery,
    AggRangeValueQuery,
    GroupByQuery,
    LatestPointQuery,
    RangeQueryDesc,
    ValueRangeQueryDesc,
    GroupByQueryDesc,
    DeviceQuery,
    VerificationQuery,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::PreciseQuery => "precise_query",
            Self::RangeQuery => "range_query",
            Self::ValueRangeQuery => "value_range_query",
            Self::AggRangeQuery => "agg_range_query",
            Self::AggValueQuery => "agg_value_query",
            Self::AggRangeValueQuery => "agg_range_value_query",
            Self::GroupByQuery => "group_by_query",
            Self::LatestPointQuery => "latest_point_query",
            Self::RangeQueryDesc => "range_query_desc",
            Self::ValueRangeQueryDesc => "value_range_query_desc",
            Self::GroupByQueryDesc => "group_by_query_desc",
            Self::DeviceQuery => "device_query",
            Self::VerificationQuery => "verification_query",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one insert or query.
///
/// A failed status always carries the error and the text that was sent, so
/// the statement can be replayed by hand. `rows` is only set when rows were
/// captured for comparison or the operation returns rows by definition.
#[derive(Debug)]
pub struct Status {
    pub operation: Operation,
    pub success: bool,
    pub points: u64,
    pub error: Option<AdapterError>,
    pub query: Option<String>,
    pub rows: Option<Vec<Row>>,
}

impl Status {
    pub fn ok(operation: Operation, points: u64) -> Self {
        Self {
            operation,
            success: true,
            points,
            error: None,
            query: None,
            rows: None,
        }
    }

    pub fn failed(operation: Operation, error: AdapterError, query: impl Into<String>) -> Self {
        Self {
            operation,
            success: false,
            points: 0,
            error: Some(error),
            query: Some(query.into()),
            rows: None,
        }
    }

    /// Failure raised before any text was built or sent
    pub fn rejected(operation: Operation, error: AdapterError) -> Self {
        Self {
            operation,
            success: false,
            points: 0,
            error: Some(error),
            query: None,
            rows: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = Some(rows);
        self
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(f, "{}: ok, {} point(s)", self.operation, self.points)?;
            if let Some(rows) = &self.rows {
                write!(f, ", {} row(s)", rows.len())?;
            }
            Ok(())
        } else {
            write!(f, "{}: failed", self.operation)?;
            if let Some(error) = &self.error {
                write!(f, ": {}", error)?;
            }
            Ok(())
        }
    }
}
