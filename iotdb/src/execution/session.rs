//! Native session transport
//!
//! One long-lived session serves steady-state inserts and queries. Schema
//! registration and cleanup each open their own short-lived session, which
//! is closed before returning whatever the statements did.

use super::{drain, MetaTask, QueryOutcome, StatementSink};
use crate::config::{AdapterConfig, DataModel, SessionInsertMode};
use crate::error::{AdapterError, TransportError};
use crate::model::ModelStrategy;
use crate::tablet::DeviceRecords;
use crate::transport::{SessionClient, SessionFactory, SessionSettings};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use tsbench_shared::{Batch, DeviceSchema, SensorType};

pub struct SessionStrategy {
    model: ModelStrategy,
    factory: Arc<dyn SessionFactory>,
    settings: SessionSettings,
    insert_mode: SessionInsertMode,
    aligned: bool,
    session: Option<Box<dyn SessionClient>>,
}

impl SessionStrategy {
    pub fn new(config: &AdapterConfig, model: ModelStrategy, factory: Arc<dyn SessionFactory>) -> Self {
        let settings = SessionSettings {
            node_urls: config.node_urls(),
            username: config.username.clone(),
            password: config.password.clone(),
            sql_dialect: model.data_model(),
            database: match model.data_model() {
                DataModel::Table => config.database.clone(),
                DataModel::Tree => None,
            },
            compression: config.thrift_compression,
        };
        Self {
            model,
            factory,
            settings,
            insert_mode: config.session_insert_mode,
            aligned: config.sensor_alignment,
            session: None,
        }
    }

    pub(crate) async fn init(&mut self) -> Result<(), AdapterError> {
        if self.session.is_some() {
            return Ok(());
        }
        let mut session = self.factory.create(&self.settings);
        session.open().await.map_err(AdapterError::Connection)?;
        debug!(nodes = ?self.settings.node_urls, "Session opened");
        self.session = Some(session);
        Ok(())
    }

    pub(crate) async fn close(&mut self) -> Result<(), AdapterError> {
        match self.session.take() {
            Some(mut session) => session.close().await.map_err(AdapterError::Connection),
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
        let target = self.model.insert_target(&batch.device);
        let session = self
            .session
            .as_deref_mut()
            .ok_or_else(|| AdapterError::Connection(TransportError::NotOpen))?;

        match self.insert_mode {
            SessionInsertMode::Tablet => {
                let tablet = self.model.tablet(batch);
                self.model
                    .insert_tablet(session, &tablet)
                    .await
                    .map_err(|e| AdapterError::from_transport(target.as_str(), e))?;
                Ok(tablet.point_count())
            }
            SessionInsertMode::Records | SessionInsertMode::Record => {
                let measurements: Vec<String> =
                    batch.device.sensor_names().map(str::to_string).collect();
                let types: Vec<SensorType> =
                    batch.device.sensors.iter().map(|s| s.sensor_type).collect();
                let all = DeviceRecords {
                    device: &target,
                    aligned: self.aligned,
                    measurements: &measurements,
                    types: &types,
                    records: &batch.records,
                };

                if self.insert_mode == SessionInsertMode::Records {
                    session
                        .insert_records(all)
                        .await
                        .map_err(|e| AdapterError::from_transport(target.as_str(), e))?;
                } else {
                    for record in &batch.records {
                        let one = DeviceRecords {
                            records: std::slice::from_ref(record),
                            ..all
                        };
                        session
                            .insert_records(one)
                            .await
                            .map_err(|e| AdapterError::from_transport(target.as_str(), e))?;
                    }
                }
                Ok(batch.point_count())
            }
        }
    }

    pub(crate) async fn query(&mut self, sql: &str, capture: bool) -> Result<QueryOutcome, AdapterError> {
        let session = self
            .session
            .as_deref_mut()
            .ok_or_else(|| AdapterError::Connection(TransportError::NotOpen))?;
        let mut cursor = session
            .execute_query(sql)
            .await
            .map_err(|e| AdapterError::from_transport(sql, e))?;
        drain(cursor.as_mut(), capture)
            .await
            .map_err(|e| AdapterError::from_transport(sql, e))
    }

    /// Run statements over a fresh session that works outside any database,
    /// since registration may be what creates it.
    async fn run_meta(&mut self, task: MetaTask, statements: &[String]) -> Result<(), AdapterError> {
        let settings = SessionSettings {
            database: None,
            ..self.settings.clone()
        };
        let mut session = self.factory.create(&settings);
        session.open().await.map_err(AdapterError::Connection)?;

        let result = task
            .run(&mut SessionSink(session.as_mut()), statements)
            .await;

        if let Err(e) = session.close().await {
            warn!(error = %e, task = ?task, "Failed to close metadata session");
        }
        result
    }
}

struct SessionSink<'a>(&'a mut dyn SessionClient);

#[async_trait]
impl StatementSink for SessionSink<'_> {
    async fn execute(&mut self, sql: &str) -> Result<(), TransportError> {
        self.0.execute_statement(sql).await
    }
}
