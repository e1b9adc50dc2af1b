//! Transport client seams
//!
//! The native session protocol and the JDBC driver are supplied by the
//! embedding benchmark; the adapter only talks to them through these traits.
//! The REST transport is implemented in-crate on top of `reqwest`.

use crate::config::DataModel;
use crate::error::TransportError;
use crate::tablet::{DeviceRecords, Tablet};
use async_trait::async_trait;
use tsbench_shared::Row;

/// Forward-only cursor over a query result.
///
/// Rows expose the time column as [`Row::timestamp`] and the remaining
/// selected columns as fields in select-list order.
#[async_trait]
pub trait RowCursor: Send {
    async fn next(&mut self) -> Result<Option<Row>, TransportError>;
}

/// Cursor over rows that are already in memory
#[derive(Debug, Default)]
pub struct VecCursor {
    rows: std::vec::IntoIter<Row>,
}

impl VecCursor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

#[async_trait]
impl RowCursor for VecCursor {
    async fn next(&mut self) -> Result<Option<Row>, TransportError> {
        Ok(self.rows.next())
    }
}

/// Settings a session is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// `host:port` of every node the session may use
    pub node_urls: Vec<String>,
    pub username: String,
    pub password: String,
    pub sql_dialect: DataModel,
    /// Database the session works in (table dialect)
    pub database: Option<String>,
    pub compression: bool,
}

/// A stateful native-protocol session
#[async_trait]
pub trait SessionClient: Send {
    async fn open(&mut self) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;

    async fn execute_query(&mut self, sql: &str) -> Result<Box<dyn RowCursor>, TransportError>;

    /// Execute a statement that returns no rows (DDL, deletes)
    async fn execute_statement(&mut self, sql: &str) -> Result<(), TransportError>;

    /// Insert a tree-model tablet, aligned or not per [`Tablet::aligned`]
    async fn insert_tablet(&mut self, tablet: &Tablet) -> Result<(), TransportError>;

    /// Insert a table-model tablet with tag and field columns
    async fn insert_relational_tablet(&mut self, tablet: &Tablet) -> Result<(), TransportError>;

    /// Insert rows of one device
    async fn insert_records(&mut self, records: DeviceRecords<'_>) -> Result<(), TransportError>;
}

/// Builds unopened sessions. Implemented by the embedding benchmark.
pub trait SessionFactory: Send + Sync {
    fn create(&self, settings: &SessionSettings) -> Box<dyn SessionClient>;
}

/// A JDBC-style SQL connection
#[async_trait]
pub trait SqlConnection: Send {
    async fn execute_query(&mut self, sql: &str) -> Result<Box<dyn RowCursor>, TransportError>;

    async fn execute_update(&mut self, sql: &str) -> Result<(), TransportError>;

    /// Execute statements as one batch
    async fn execute_batch(&mut self, statements: &[String]) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens SQL connections. Implemented by the embedding benchmark.
#[async_trait]
pub trait SqlDriver: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<Box<dyn SqlConnection>, TransportError>;
}
