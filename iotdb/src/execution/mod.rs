//! Execution strategies
//!
//! An execution strategy owns the connection(s) to the database and turns
//! query text or a batch into an outcome. Three transports exist; the
//! session and JDBC clients are supplied by the embedding benchmark through
//! [`Backends`], the REST client is built in-crate.

pub mod jdbc;
pub mod rest;
pub mod session;

use crate::config::{AdapterConfig, TransportKind};
use crate::error::{AdapterError, TransportError};
use crate::model::ModelStrategy;
use crate::sql_log;
use crate::transport::{RowCursor, SessionFactory, SqlDriver};
use async_trait::async_trait;
use std::sync::Arc;
use tsbench_shared::{Batch, DeviceSchema, Row};

pub use jdbc::JdbcStrategy;
pub use rest::RestStrategy;
pub use session::SessionStrategy;

/// External transport clients. Only the one matching the configured
/// transport is required.
#[derive(Clone, Default)]
pub struct Backends {
    pub session: Option<Arc<dyn SessionFactory>>,
    pub sql: Option<Arc<dyn SqlDriver>>,
}

impl Backends {
    pub fn session(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            session: Some(factory),
            sql: None,
        }
    }

    pub fn sql(driver: Arc<dyn SqlDriver>) -> Self {
        Self {
            session: None,
            sql: Some(driver),
        }
    }
}

/// What a strategy supports beyond counting points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Executed text may carry the debug prefix
    pub debug_sampling: bool,
    /// Result rows can be captured for comparison
    pub row_capture: bool,
}

/// Raw outcome of one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    /// Non-null fields across all returned rows
    pub points: u64,
    /// Returned rows, only when capture was requested
    pub rows: Option<Vec<Row>>,
}

pub enum ExecutionStrategy {
    Session(SessionStrategy),
    Jdbc(JdbcStrategy),
    Rest(RestStrategy),
}

impl ExecutionStrategy {
    /// Pick the strategy named by `config.transport`
    pub fn from_config(
        config: &AdapterConfig,
        model: ModelStrategy,
        backends: &Backends,
    ) -> Result<Self, AdapterError> {
        match config.transport {
            TransportKind::Session => {
                let factory = backends.session.clone().ok_or_else(|| {
                    AdapterError::Config("session transport needs a session factory".to_string())
                })?;
                Ok(Self::Session(SessionStrategy::new(config, model, factory)))
            }
            TransportKind::Jdbc => {
                let driver = backends.sql.clone().ok_or_else(|| {
                    AdapterError::Config("jdbc transport needs a SQL driver".to_string())
                })?;
                Ok(Self::Jdbc(JdbcStrategy::new(config, model, driver)))
            }
            TransportKind::Rest => Ok(Self::Rest(RestStrategy::new(config, model)?)),
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Session(_) => TransportKind::Session,
            Self::Jdbc(_) => TransportKind::Jdbc,
            Self::Rest(_) => TransportKind::Rest,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Session(_) | Self::Jdbc(_) => Capabilities {
                debug_sampling: true,
                row_capture: true,
            },
            Self::Rest(_) => Capabilities {
                debug_sampling: false,
                row_capture: false,
            },
        }
    }

    /// Open the steady-state connection. Calling it twice is a no-op.
    pub async fn init(&mut self) -> Result<(), AdapterError> {
        match self {
            Self::Session(s) => s.init().await,
            Self::Jdbc(s) => s.init().await,
            Self::Rest(_) => Ok(()),
        }
    }

    /// Close the steady-state connection. Safe to call when not open.
    pub async fn close(&mut self) -> Result<(), AdapterError> {
        match self {
            Self::Session(s) => s.close().await,
            Self::Jdbc(s) => s.close().await,
            Self::Rest(_) => Ok(()),
        }
    }

    /// Drop all benchmark data over a short-lived connection
    pub async fn cleanup(&mut self) -> Result<(), AdapterError> {
        match self {
            Self::Session(s) => s.cleanup().await,
            Self::Jdbc(s) => s.cleanup().await,
            Self::Rest(s) => s.cleanup().await,
        }
    }

    /// Register every schema over a short-lived connection
    pub async fn register(&mut self, schemas: &[DeviceSchema]) -> Result<(), AdapterError> {
        match self {
            Self::Session(s) => s.register(schemas).await,
            Self::Jdbc(s) => s.register(schemas).await,
            Self::Rest(s) => s.register(schemas).await,
        }
    }

    /// Write one batch, returning the number of non-null values written
    pub async fn insert(&mut self, batch: &Batch) -> Result<u64, AdapterError> {
        match self {
            Self::Session(s) => s.insert(batch).await,
            Self::Jdbc(s) => s.insert(batch).await,
            Self::Rest(s) => s.insert(batch).await,
        }
    }

    /// Execute a query and count its points, keeping the rows on request
    pub async fn query(&mut self, sql: &str, capture: bool) -> Result<QueryOutcome, AdapterError> {
        match self {
            Self::Session(s) => s.query(sql, capture).await,
            Self::Jdbc(s) => s.query(sql, capture).await,
            Self::Rest(s) => s.query(sql).await,
        }
    }

    /// Execute a query and return every row
    pub async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Row>, AdapterError> {
        match self {
            Self::Session(s) => Ok(s.query(sql, true).await?.rows.unwrap_or_default()),
            Self::Jdbc(s) => Ok(s.query(sql, true).await?.rows.unwrap_or_default()),
            Self::Rest(s) => s.fetch_rows(sql).await,
        }
    }
}

impl std::fmt::Debug for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ExecutionStrategy").field(&self.kind()).finish()
    }
}

/// Anything that executes a statement without a result set
#[async_trait]
pub(crate) trait StatementSink: Send {
    async fn execute(&mut self, sql: &str) -> Result<(), TransportError>;
}

/// Run registration statements in order. Already-exists failures are logged
/// and skipped; any other failure stops the run.
pub(crate) async fn run_registration(
    sink: &mut dyn StatementSink,
    statements: &[String],
) -> Result<(), AdapterError> {
    for sql in statements {
        match sink.execute(sql).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => sql_log::already_exists(sql, &e.to_string()),
            Err(e) => return Err(AdapterError::from_transport(sql.as_str(), e)),
        }
    }
    Ok(())
}

/// Run cleanup statements, tolerating every failure the database itself
/// reported
pub(crate) async fn run_cleanup(
    sink: &mut dyn StatementSink,
    statements: &[String],
) -> Result<(), AdapterError> {
    for sql in statements {
        match sink.execute(sql).await {
            Ok(()) => {}
            Err(e @ TransportError::Statement { .. }) => {
                sql_log::cleanup_skipped(sql, &e.to_string())
            }
            Err(e) => return Err(AdapterError::from_transport(sql.as_str(), e)),
        }
    }
    Ok(())
}

/// Statement run performed over a short-lived metadata connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MetaTask {
    Register,
    Cleanup,
}

impl MetaTask {
    pub(crate) async fn run(
        self,
        sink: &mut dyn StatementSink,
        statements: &[String],
    ) -> Result<(), AdapterError> {
        match self {
            Self::Register => run_registration(sink, statements).await,
            Self::Cleanup => run_cleanup(sink, statements).await,
        }
    }
}

/// Drain a cursor, counting non-null fields
pub(crate) async fn drain(
    cursor: &mut dyn RowCursor,
    capture: bool,
) -> Result<QueryOutcome, TransportError> {
    let mut outcome = QueryOutcome {
        points: 0,
        rows: capture.then(Vec::new),
    };
    while let Some(row) = cursor.next().await? {
        outcome.points += row.point_count();
        if let Some(rows) = outcome.rows.as_mut() {
            rows.push(row);
        }
    }
    Ok(outcome)
}
