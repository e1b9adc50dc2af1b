//! Device and sensor schema
//!
//! A [`DeviceSchema`] identifies one benchmarked entity: the group it belongs
//! to, an ordered list of tags, the device id and the sensors it reports.
//! Schemas are built once by the workload generator and only read afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared data type of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    Text,
    String,
    Blob,
    Timestamp,
    Date,
}

impl SensorType {
    /// All sensor types, in declaration order.
    pub const ALL: [SensorType; 10] = [
        SensorType::Boolean,
        SensorType::Int32,
        SensorType::Int64,
        SensorType::Float,
        SensorType::Double,
        SensorType::Text,
        SensorType::String,
        SensorType::Blob,
        SensorType::Timestamp,
        SensorType::Date,
    ];

    /// Upper-case type name as the database spells it (e.g. `INT32`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Text => "TEXT",
            Self::String => "STRING",
            Self::Blob => "BLOB",
            Self::Timestamp => "TIMESTAMP",
            Self::Date => "DATE",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SensorType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("Invalid sensor type: {}", s))
    }
}

/// A named measurement of a device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sensor {
    pub name: String,
    pub sensor_type: SensorType,
}

impl Sensor {
    pub fn new(name: impl Into<String>, sensor_type: SensorType) -> Self {
        Self {
            name: name.into(),
            sensor_type,
        }
    }
}

/// Identity and sensor layout of one benchmarked device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSchema {
    /// Group the device belongs to
    pub group: String,

    /// Tag key/value pairs in declaration order. The order is part of the
    /// device identity in hierarchical naming.
    pub tags: Vec<(String, String)>,

    /// Device id
    pub device: String,

    /// Sensors in column order
    pub sensors: Vec<Sensor>,
}

impl DeviceSchema {
    /// Create an untagged device schema
    pub fn new(group: impl Into<String>, device: impl Into<String>, sensors: Vec<Sensor>) -> Self {
        Self {
            group: group.into(),
            tags: Vec::new(),
            device: device.into(),
            sensors,
        }
    }

    /// Append a tag, keeping declaration order
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    /// Tag keys in declaration order
    pub fn tag_keys(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|(k, _)| k.as_str())
    }

    /// Tag values in declaration order
    pub fn tag_values(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|(_, v)| v.as_str())
    }

    /// Names of the sensors in column order
    pub fn sensor_names(&self) -> impl Iterator<Item = &str> {
        self.sensors.iter().map(|s| s.name.as_str())
    }
}
