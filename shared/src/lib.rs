//! Shared types and utilities for tsbench
//!
//! This crate contains the benchmark data model: device schemas, sensors,
//! records and batches, the query shapes issued by a benchmark workload, and
//! the raw rows a database hands back.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{query::*, record::*, schema::*, value::*};
