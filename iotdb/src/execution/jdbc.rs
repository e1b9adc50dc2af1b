//! JDBC-style SQL transport
//!
//! Everything, inserts included, travels as SQL text. A batch becomes one
//! `INSERT` statement per record, executed as a single statement batch.

use super::{drain, MetaTask, QueryOutcome, StatementSink};
use crate::config::{AdapterConfig, DataModel};
use crate::error::{AdapterError, TransportError};
use crate::model::ModelStrategy;
use crate::transport::{SqlConnection, SqlDriver};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use tsbench_shared::{Batch, DeviceSchema};

pub struct JdbcStrategy {
    model: ModelStrategy,
    driver: Arc<dyn SqlDriver>,
    url: String,
    username: String,
    password: String,
    connection: Option<Box<dyn SqlConnection>>,
}

impl JdbcStrategy {
    pub fn new(config: &AdapterConfig, model: ModelStrategy, driver: Arc<dyn SqlDriver>) -> Self {
        let node = config.node_urls().into_iter().next().unwrap_or_default();
        let url = jdbc_url(&node, model.data_model());
        Self {
            model,
            driver,
            url,
            username: config.username.clone(),
            password: config.password.clone(),
            connection: None,
        }
    }

    pub(crate) async fn init(&mut self) -> Result<(), AdapterError> {
        if self.connection.is_none() {
            self.connection = Some(self.connect().await?);
            debug!(url = %self.url, "JDBC connection opened");
        }
        Ok(())
    }

    pub(crate) async fn close(&mut self) -> Result<(), AdapterError> {
        match self.connection.take() {
            Some(mut connection) => connection.close().await.map_err(AdapterError::Connection),
            None => Ok(()),
        }
    }

    pub(crate) async fn register(&mut self, schemas: &[DeviceSchema]) -> Result<(), AdapterError> {
        let statements = self.model.registration_statements(schemas);
        self.run_meta(MetaTask::Register, &statements).await
    }

    pub(crate) async fn cleanup(&mut self) -> Result<(), AdapterError> {
        let statements = self.model.cleanup_statements();
        self.run_meta(MetaTask::Cleanup, &statements).await
    }

    pub(crate) async fn insert(&mut self, batch: &Batch) -> Result<u64, AdapterError> {
        let statements = self.model.insert_statements(batch);
        let connection = self
            .connection
            .as_deref_mut()
            .ok_or_else(|| AdapterError::Connection(TransportError::NotOpen))?;
        connection
            .execute_batch(&statements)
            .await
            .map_err(|e| AdapterError::from_transport(statements.join("; "), e))?;
        Ok(batch.point_count())
    }

    pub(crate) async fn query(&mut self, sql: &str, capture: bool) -> Result<QueryOutcome, AdapterError> {
        let connection = self
            .connection
            .as_deref_mut()
            .ok_or_else(|| AdapterError::Connection(TransportError::NotOpen))?;
        let mut cursor = connection
            .execute_query(sql)
            .await
            .map_err(|e| AdapterError::from_transport(sql, e))?;
        drain(cursor.as_mut(), capture)
            .await
            .map_err(|e| AdapterError::from_transport(sql, e))
    }

    async fn connect(&mut self) -> Result<Box<dyn SqlConnection>, AdapterError> {
        self.driver
            .connect(&self.url, &self.username, &self.password)
            .await
            .map_err(AdapterError::Connection)
    }

    async fn run_meta(&mut self, task: MetaTask, statements: &[String]) -> Result<(), AdapterError> {
        let mut connection = self.connect().await?;
        let result = task
            .run(&mut ConnectionSink(connection.as_mut()), statements)
            .await;
        if let Err(e) = connection.close().await {
            warn!(error = %e, task = ?task, "Failed to close metadata connection");
        }
        result
    }
}

/// `jdbc:iotdb://host:port/`, selecting the table dialect when needed
pub fn jdbc_url(node: &str, model: DataModel) -> String {
    match model {
        DataModel::Tree => format!("jdbc:iotdb://{}/", node),
        DataModel::Table => format!("jdbc:iotdb://{}/?sql_dialect=table", node),
    }
}

struct ConnectionSink<'a>(&'a mut dyn SqlConnection);

#[async_trait]
impl StatementSink for ConnectionSink<'_> {
    async fn execute(&mut self, sql: &str) -> Result<(), TransportError> {
        self.0.execute_update(sql).await
    }
}
