//! Benchmark data model

pub mod query;
pub mod record;
pub mod schema;
pub mod value;
