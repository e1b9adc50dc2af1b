//! IoTDB adapter for tsbench
//!
//! Turns benchmark query shapes into IoTDB SQL under the tree or table data
//! model, and executes them, together with batch inserts, over a native
//! session, a JDBC-style connection, or the REST API.

pub mod adapter;
pub mod config;
pub mod error;
pub mod execution;
pub mod metrics;
pub mod model;
pub mod naming;
pub mod query;
pub mod sampling;
pub mod sql_log;
pub mod status;
pub mod tablet;
pub mod transport;

pub use adapter::{Adapter, Database};
pub use config::{AdapterConfig, DataModel, SessionInsertMode, TransportKind};
pub use error::{AdapterError, TransportError};
pub use execution::{Backends, Capabilities, ExecutionStrategy, QueryOutcome};
pub use model::ModelStrategy;
pub use naming::PathNaming;
pub use query::QueryBuilder;
pub use status::{Operation, Status};
