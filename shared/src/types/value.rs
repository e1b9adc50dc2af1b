//! Typed sensor values

use crate::utils::bytes_to_hex;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

/// One sensor value. Absent values are modelled as `Option<Value>::None` by
/// the containers that hold them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(i64),
    Date(NaiveDate),
}

impl Value {
    /// Best-effort conversion from an untyped JSON scalar. Arrays, objects
    /// and `null` yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int64)
                .or_else(|| n.as_f64().map(Self::Double)),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Int64(v) | Self::Timestamp(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
            Self::Blob(bytes) => write!(f, "0x{}", bytes_to_hex(bytes)),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Int32(v) => serializer.serialize_i32(*v),
            Self::Int64(v) | Self::Timestamp(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f32(*v),
            Self::Double(v) => serializer.serialize_f64(*v),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Blob(_) | Self::Date(_) => serializer.collect_str(self),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}
