//! Records written to and rows read from the database

use crate::types::schema::DeviceSchema;
use crate::types::value::Value;
use serde::Serialize;

/// One timestamped row of sensor values, positionally aligned with the
/// owning schema's sensor list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub timestamp: i64,
    pub values: Vec<Option<Value>>,
}

impl Record {
    pub fn new(timestamp: i64, values: Vec<Option<Value>>) -> Self {
        Self { timestamp, values }
    }

    /// Number of non-null values
    pub fn point_count(&self) -> u64 {
        self.values.iter().filter(|v| v.is_some()).count() as u64
    }
}

/// An ordered group of records for one device, inserted in one call
#[derive(Debug, Clone)]
pub struct Batch {
    pub device: DeviceSchema,
    pub records: Vec<Record>,
}

impl Batch {
    pub fn new(device: DeviceSchema, records: Vec<Record>) -> Self {
        Self { device, records }
    }

    /// Number of non-null values across all records
    pub fn point_count(&self) -> u64 {
        self.records.iter().map(Record::point_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A row returned by a query: the row time plus the selected fields in
/// select-list order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub timestamp: i64,
    pub fields: Vec<Option<Value>>,
}

impl Row {
    pub fn new(timestamp: i64, fields: Vec<Option<Value>>) -> Self {
        Self { timestamp, fields }
    }

    /// Number of non-null fields
    pub fn point_count(&self) -> u64 {
        self.fields.iter().filter(|v| v.is_some()).count() as u64
    }
}

/// Line count and time bounds of one device, used to summarise a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub device: String,
    pub total_line_number: u64,
    pub min_timestamp: i64,
    pub max_timestamp: i64,
}
