//! Data-model strategies
//!
//! A model strategy knows how one schema convention spells the pieces of a
//! query (select list, `FROM` clause, device and value filters, bucketed
//! aggregation), how a batch is shaped for insertion, and which statements
//! register or drop benchmark metadata. Exactly two conventions exist, so
//! the strategy is a closed enum chosen from configuration.

pub mod table;
pub mod tree;

use crate::config::{AdapterConfig, DataModel};
use crate::error::TransportError;
use crate::naming::PathNaming;
use crate::tablet::Tablet;
use crate::transport::SessionClient;
use tsbench_shared::utils::{bytes_to_hex, quote_sql_string};
use tsbench_shared::{Batch, DeviceSchema, Record, Value};

pub use table::TableStrategy;
pub use tree::TreeStrategy;

/// Joiner placed in front of a predicate that extends an existing `WHERE`.
pub(crate) const AND: &str = " AND ";
/// Keyword placed in front of the first predicate of a query.
pub(crate) const WHERE: &str = " WHERE ";

#[derive(Debug, Clone)]
pub enum ModelStrategy {
    Tree(TreeStrategy),
    Table(TableStrategy),
}

impl ModelStrategy {
    pub fn from_config(config: &AdapterConfig) -> Self {
        match config.model {
            DataModel::Tree => Self::Tree(TreeStrategy::new(config)),
            DataModel::Table => Self::Table(TableStrategy::new(config)),
        }
    }

    pub fn data_model(&self) -> DataModel {
        match self {
            Self::Tree(_) => DataModel::Tree,
            Self::Table(_) => DataModel::Table,
        }
    }

    pub fn naming(&self) -> &PathNaming {
        match self {
            Self::Tree(s) => s.naming(),
            Self::Table(s) => s.naming(),
        }
    }

    /// Comma-separated raw column list, e.g. `s0, s1`
    pub fn select_list(&self, devices: &[DeviceSchema]) -> String {
        match self {
            Self::Tree(s) => s.select_list(devices),
            Self::Table(s) => s.select_list(devices),
        }
    }

    /// Column list of a latest-point query
    pub fn latest_select_list(&self, devices: &[DeviceSchema]) -> String {
        match self {
            Self::Tree(s) => s.latest_select_list(devices),
            Self::Table(s) => s.latest_select_list(devices),
        }
    }

    /// ` FROM ...` clause naming every queried device
    pub fn from_clause(&self, devices: &[DeviceSchema]) -> String {
        match self {
            Self::Tree(s) => s.from_clause(devices),
            Self::Table(s) => s.from_clause(devices),
        }
    }

    /// Row predicate selecting the queried devices, when device identity is
    /// not already part of the `FROM` clause
    pub fn device_filter(&self, devices: &[DeviceSchema]) -> Option<String> {
        match self {
            Self::Tree(_) => None,
            Self::Table(s) => Some(s.device_filter(devices)),
        }
    }

    /// `OR` over devices of `AND` over sensors of `sensor > threshold`.
    ///
    /// With `first_clause` the fragment opens the `WHERE` clause itself;
    /// otherwise it starts with ` AND ` to extend an existing condition.
    pub fn value_filter_clause(
        &self,
        devices: &[DeviceSchema],
        threshold: f64,
        first_clause: bool,
    ) -> String {
        let body = match self {
            Self::Tree(s) => s.value_filter(devices, threshold),
            Self::Table(s) => s.value_filter(devices, threshold),
        };
        let joiner = if first_clause { WHERE } else { AND };
        format!("{}{}", joiner, body)
    }

    /// Complete bucketed aggregation over `[start, end)`
    pub fn group_by(
        &self,
        devices: &[DeviceSchema],
        agg_fun: &str,
        start: i64,
        end: i64,
        granularity_ms: u64,
    ) -> String {
        match self {
            Self::Tree(s) => s.group_by(devices, agg_fun, start, end, granularity_ms),
            Self::Table(s) => s.group_by(devices, agg_fun, start, end, granularity_ms),
        }
    }

    /// Device path or table that receives inserts for `schema`
    pub fn insert_target(&self, schema: &DeviceSchema) -> String {
        match self {
            Self::Tree(s) => s.naming().path(schema),
            Self::Table(s) => s.qualified_table(schema),
        }
    }

    /// Columnar payload for one batch
    pub fn tablet(&self, batch: &Batch) -> Tablet {
        match self {
            Self::Tree(s) => s.tablet(batch),
            Self::Table(s) => s.tablet(batch),
        }
    }

    /// SQL `INSERT` statements for one batch, one per record
    pub fn insert_statements(&self, batch: &Batch) -> Vec<String> {
        match self {
            Self::Tree(s) => s.insert_statements(batch),
            Self::Table(s) => s.insert_statements(batch),
        }
    }

    /// Hand a tablet to a session with the call this model requires
    pub async fn insert_tablet(
        &self,
        session: &mut dyn SessionClient,
        tablet: &Tablet,
    ) -> Result<(), TransportError> {
        match self {
            Self::Tree(_) => session.insert_tablet(tablet).await,
            Self::Table(_) => session.insert_relational_tablet(tablet).await,
        }
    }

    /// Statements registering every database, series or table of `schemas`
    pub fn registration_statements(&self, schemas: &[DeviceSchema]) -> Vec<String> {
        match self {
            Self::Tree(s) => s.registration_statements(schemas),
            Self::Table(s) => s.registration_statements(schemas),
        }
    }

    /// Statements dropping all benchmark data
    pub fn cleanup_statements(&self) -> Vec<String> {
        match self {
            Self::Tree(s) => s.cleanup_statements(),
            Self::Table(s) => s.cleanup_statements(),
        }
    }
}

/// `fn(s0), fn(s1), ...` over the first device's sensors
pub(crate) fn agg_list(devices: &[DeviceSchema], agg_fun: &str) -> String {
    first_device(devices)
        .sensor_names()
        .map(|name| format!("{}({})", agg_fun, name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The device whose sensor layout every multi-device query follows.
pub(crate) fn first_device(devices: &[DeviceSchema]) -> &DeviceSchema {
    debug_assert!(!devices.is_empty(), "a query names at least one device");
    &devices[0]
}

/// `a > t AND b > t AND ...`
pub(crate) fn threshold_chain<I>(columns: I, threshold: f64) -> String
where
    I: IntoIterator<Item = String>,
{
    columns
        .into_iter()
        .map(|column| format!("{} > {}", column, threshold))
        .collect::<Vec<_>>()
        .join(AND)
}

/// SQL literal of one value; `null` when absent
pub(crate) fn sql_literal(value: Option<&Value>) -> String {
    match value {
        None => "null".to_string(),
        Some(Value::Text(s)) => quote_sql_string(s),
        Some(Value::Blob(bytes)) => format!("X'{}'", bytes_to_hex(bytes)),
        Some(v @ Value::Date(_)) => quote_sql_string(&v.to_string()),
        Some(v) => v.to_string(),
    }
}

/// SQL literals of one record, in sensor order
pub(crate) fn record_literals(record: &Record) -> Vec<String> {
    record.values.iter().map(|v| sql_literal(v.as_ref())).collect()
}
