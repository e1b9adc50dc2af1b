//! Adapter facade
//!
//! [`Adapter`] wires a model strategy and an execution strategy together
//! and applies the crosscutting policies in one place: debug-sampling of
//! executed text, row capture for comparison runs, SQL logging, metrics,
//! and the mapping of every outcome into a [`Status`].

use crate::config::AdapterConfig;
use crate::error::AdapterError;
use crate::execution::{Backends, Capabilities, ExecutionStrategy};
use crate::metrics;
use crate::model::ModelStrategy;
use crate::query::{check_devices, check_threshold, QueryBuilder, Verification};
use crate::sampling::DebugSampler;
use crate::sql_log;
use crate::status::{Operation, Status};
use async_trait::async_trait;
use rand::RngCore;
use std::time::Instant;
use tracing::{error, info};
use tsbench_shared::utils::time::nanos_to_secs;
use tsbench_shared::{
    AggRangeQuery, AggRangeValueQuery, AggValueQuery, Batch, DeviceQuery, DeviceSchema,
    DeviceSummary, GroupByQuery, LatestPointQuery, PreciseQuery, RangeQuery, Row, Value,
    ValueRangeQuery, VerificationQuery,
};

/// The database-under-test contract a benchmark worker drives.
///
/// Lifecycle and registration calls return `Err` on failure. Every insert
/// and query returns a [`Status`] instead, so one failed operation never
/// stops the run.
#[async_trait]
pub trait Database: Send {
    async fn init(&mut self) -> Result<(), AdapterError>;

    /// Drop all benchmark data. Safe to call repeatedly.
    async fn cleanup(&mut self) -> Result<(), AdapterError>;

    async fn close(&mut self) -> Result<(), AdapterError>;

    /// Register all schemas, returning the elapsed seconds
    async fn register_schema(&mut self, schemas: &[DeviceSchema]) -> Result<f64, AdapterError>;

    async fn insert_batch(&mut self, batch: &Batch) -> Status;

    async fn precise_query(&mut self, query: &PreciseQuery) -> Status;
    async fn range_query(&mut self, query: &RangeQuery) -> Status;
    async fn value_range_query(&mut self, query: &ValueRangeQuery) -> Status;
    async fn agg_range_query(&mut self, query: &AggRangeQuery) -> Status;
    async fn agg_value_query(&mut self, query: &AggValueQuery) -> Status;
    async fn agg_range_value_query(&mut self, query: &AggRangeValueQuery) -> Status;
    async fn group_by_query(&mut self, query: &GroupByQuery) -> Status;
    async fn latest_point_query(&mut self, query: &LatestPointQuery) -> Status;
    async fn range_query_desc(&mut self, query: &RangeQuery) -> Status;
    async fn value_range_query_desc(&mut self, query: &ValueRangeQuery) -> Status;
    async fn group_by_query_desc(&mut self, query: &GroupByQuery) -> Status;

    /// Read back written records and count the values that match
    async fn verification_query(&mut self, query: &VerificationQuery) -> Status;

    /// Rows of one device, always returned with the status
    async fn device_query(&mut self, query: &DeviceQuery) -> Status;

    async fn device_summary(&mut self, query: &DeviceQuery) -> Result<DeviceSummary, AdapterError>;
}

/// IoTDB adapter. One instance per benchmark worker.
pub struct Adapter {
    config: AdapterConfig,
    queries: QueryBuilder,
    execution: ExecutionStrategy,
    sampler: DebugSampler,
}

impl Adapter {
    /// Build an adapter whose debug sampling draws from a source seeded
    /// with `config.seed`
    pub fn new(config: AdapterConfig, backends: Backends) -> Result<Self, AdapterError> {
        let sampler = DebugSampler::seeded(config.debug_ratio(), config.seed);
        Self::build(config, backends, sampler)
    }

    /// Build an adapter with an explicit random source for debug sampling
    pub fn with_rng(
        config: AdapterConfig,
        backends: Backends,
        rng: Box<dyn RngCore + Send>,
    ) -> Result<Self, AdapterError> {
        let sampler = DebugSampler::with_rng(config.debug_ratio(), rng);
        Self::build(config, backends, sampler)
    }

    fn build(
        config: AdapterConfig,
        backends: Backends,
        sampler: DebugSampler,
    ) -> Result<Self, AdapterError> {
        config.validate()?;
        let model = ModelStrategy::from_config(&config);
        let execution = ExecutionStrategy::from_config(&config, model.clone(), &backends)?;
        info!(
            model = ?config.model,
            transport = ?config.transport,
            nodes = ?config.node_urls(),
            "Adapter created"
        );
        Ok(Self {
            config,
            queries: QueryBuilder::new(model),
            execution,
            sampler,
        })
    }

    pub fn capabilities(&self) -> Capabilities {
        self.execution.capabilities()
    }

    /// Execute one generated query and map its outcome. Arguments that could
    /// not be rendered are rejected without contacting the database.
    async fn run_query(&mut self, operation: Operation, sql: Result<String, AdapterError>) -> Status {
        let sql = match sql {
            Ok(sql) => sql,
            Err(e) => return Status::rejected(operation, e),
        };
        let capabilities = self.execution.capabilities();
        let executed = if capabilities.debug_sampling {
            self.sampler.apply(&sql)
        } else {
            sql
        };
        sql_log::query(operation.name(), &executed, self.config.quiet);

        let capture = self.config.comparison && capabilities.row_capture;
        let start = Instant::now();
        let status = match self.execution.query(&executed, capture).await {
            Ok(outcome) if capture => Status::ok(operation, outcome.points)
                .with_query(executed)
                .with_rows(outcome.rows.unwrap_or_default()),
            Ok(outcome) => Status::ok(operation, outcome.points),
            Err(e) => {
                error!(operation = %operation, error = %e, sql = %executed, "Query failed");
                Status::failed(operation, e, executed)
            }
        };
        observe(&status, start);
        status
    }

    /// Compare returned rows with the expected values, value by value
    fn verify(verification: &Verification, rows: &[Row]) -> u64 {
        let mut points = 0;
        for row in rows {
            let Some(expected) = verification.expected.get(&row.timestamp) else {
                sql_log::value_mismatch(row.timestamp, "<no record>", &format!("{:?}", row.fields));
                continue;
            };
            for (actual, wanted) in row.fields.iter().zip(expected) {
                match (actual, wanted) {
                    (Some(a), Some(w)) if a.to_string() == w.to_string() => points += 1,
                    (None, None) => {}
                    _ => sql_log::value_mismatch(
                        row.timestamp,
                        &display_value(wanted.as_ref()),
                        &display_value(actual.as_ref()),
                    ),
                }
            }
        }
        if rows.len() != verification.expected.len() {
            sql_log::verification_mismatch(&verification.sql, verification.expected.len(), rows.len());
        }
        points
    }
}

#[async_trait]
impl Database for Adapter {
    async fn init(&mut self) -> Result<(), AdapterError> {
        self.execution.init().await
    }

    async fn cleanup(&mut self) -> Result<(), AdapterError> {
        self.execution.cleanup().await?;
        info!("Benchmark data cleaned up");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        self.execution.close().await
    }

    async fn register_schema(&mut self, schemas: &[DeviceSchema]) -> Result<f64, AdapterError> {
        if !self.config.create_schema {
            return Ok(0.0);
        }
        let start = Instant::now();
        self.execution
            .register(schemas)
            .await
            .map_err(|e| AdapterError::Registration(Box::new(e)))?;
        let elapsed = nanos_to_secs(start.elapsed().as_nanos());
        info!(devices = schemas.len(), elapsed_secs = elapsed, "Schema registered");
        Ok(elapsed)
    }

    async fn insert_batch(&mut self, batch: &Batch) -> Status {
        if batch.is_empty() {
            return Status::ok(Operation::Ingestion, 0);
        }
        let start = Instant::now();
        let status = match self.execution.insert(batch).await {
            Ok(points) => Status::ok(Operation::Ingestion, points),
            Err(e) => {
                let text = match e.text() {
                    Some(text) => text.to_string(),
                    None => self.queries.model().insert_target(&batch.device),
                };
                error!(insert = %text, error = %e, "Insert failed");
                Status::failed(Operation::Ingestion, e, text)
            }
        };
        observe(&status, start);
        status
    }

    async fn precise_query(&mut self, query: &PreciseQuery) -> Status {
        let sql = check_devices(&query.devices).map(|()| self.queries.precise(query));
        self.run_query(Operation::PreciseQuery, sql).await
    }

    async fn range_query(&mut self, query: &RangeQuery) -> Status {
        let sql = check_devices(&query.devices).map(|()| self.queries.range(query));
        self.run_query(Operation::RangeQuery, sql).await
    }

    async fn value_range_query(&mut self, query: &ValueRangeQuery) -> Status {
        let sql = check_devices(&query.devices)
            .and_then(|()| check_threshold(query.value_threshold))
            .map(|()| self.queries.value_range(query));
        self.run_query(Operation::ValueRangeQuery, sql).await
    }

    async fn agg_range_query(&mut self, query: &AggRangeQuery) -> Status {
        let sql = check_devices(&query.devices).map(|()| self.queries.agg_range(query));
        self.run_query(Operation::AggRangeQuery, sql).await
    }

    async fn agg_value_query(&mut self, query: &AggValueQuery) -> Status {
        let sql = check_devices(&query.devices)
            .and_then(|()| check_threshold(query.value_threshold))
            .map(|()| self.queries.agg_value(query));
        self.run_query(Operation::AggValueQuery, sql).await
    }

    async fn agg_range_value_query(&mut self, query: &AggRangeValueQuery) -> Status {
        let sql = check_devices(&query.devices)
            .and_then(|()| check_threshold(query.value_threshold))
            .map(|()| self.queries.agg_range_value(query));
        self.run_query(Operation::AggRangeValueQuery, sql).await
    }

    async fn group_by_query(&mut self, query: &GroupByQuery) -> Status {
        let sql = check_devices(&query.devices).map(|()| self.queries.group_by(query));
        self.run_query(Operation::GroupByQuery, sql).await
    }

    async fn latest_point_query(&mut self, query: &LatestPointQuery) -> Status {
        let sql = check_devices(&query.devices).map(|()| self.queries.latest_point(query));
        self.run_query(Operation::LatestPointQuery, sql).await
    }

    async fn range_query_desc(&mut self, query: &RangeQuery) -> Status {
        let sql = check_devices(&query.devices).map(|()| self.queries.range_desc(query));
        self.run_query(Operation::RangeQueryDesc, sql).await
    }

    async fn value_range_query_desc(&mut self, query: &ValueRangeQuery) -> Status {
        let sql = check_devices(&query.devices)
            .and_then(|()| check_threshold(query.value_threshold))
            .map(|()| self.queries.value_range_desc(query));
        self.run_query(Operation::ValueRangeQueryDesc, sql).await
    }

    async fn group_by_query_desc(&mut self, query: &GroupByQuery) -> Status {
        let sql = check_devices(&query.devices).map(|()| self.queries.group_by_desc(query));
        self.run_query(Operation::GroupByQueryDesc, sql).await
    }

    async fn verification_query(&mut self, query: &VerificationQuery) -> Status {
        let operation = Operation::VerificationQuery;
        let verification = match self.queries.verification(query) {
            Ok(verification) => verification,
            Err(e) => return Status::rejected(operation, e),
        };
        sql_log::query(operation.name(), &verification.sql, self.config.quiet);

        let start = Instant::now();
        let status = match self.execution.fetch_rows(&verification.sql).await {
            Ok(rows) => Status::ok(operation, Self::verify(&verification, &rows)),
            Err(e) => {
                error!(error = %e, sql = %verification.sql, "Verification query failed");
                Status::failed(operation, e, verification.sql)
            }
        };
        observe(&status, start);
        status
    }

    async fn device_query(&mut self, query: &DeviceQuery) -> Status {
        let operation = Operation::DeviceQuery;
        let sql = self.queries.device_query(query);
        sql_log::query(operation.name(), &sql, self.config.quiet);

        let start = Instant::now();
        let status = match self.execution.fetch_rows(&sql).await {
            Ok(rows) => Status::ok(operation, 0).with_query(sql).with_rows(rows),
            Err(e) => {
                error!(error = %e, sql = %sql, "Device query failed");
                Status::failed(operation, e, sql)
            }
        };
        observe(&status, start);
        status
    }

    async fn device_summary(&mut self, query: &DeviceQuery) -> Result<DeviceSummary, AdapterError> {
        let summary = self.queries.summary(&query.device);

        let count_rows = self.execution.fetch_rows(&summary.count).await?;
        let total_line_number = count_rows
            .first()
            .and_then(|row| row.fields.first())
            .and_then(|field| field.as_ref())
            .and_then(value_as_u64)
            .ok_or_else(|| AdapterError::MalformedResponse {
                text: summary.count.clone(),
                reason: "no count returned".to_string(),
            })?;

        let min_timestamp = self.first_timestamp(&summary.min_time).await?;
        let max_timestamp = self.first_timestamp(&summary.max_time).await?;

        Ok(DeviceSummary {
            device: query.device.device.clone(),
            total_line_number,
            min_timestamp,
            max_timestamp,
        })
    }
}

impl Adapter {
    async fn first_timestamp(&mut self, sql: &str) -> Result<i64, AdapterError> {
        let rows = self.execution.fetch_rows(sql).await?;
        rows.first()
            .map(|row| row.timestamp)
            .ok_or_else(|| AdapterError::MalformedResponse {
                text: sql.to_string(),
                reason: "no rows returned".to_string(),
            })
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("model", &self.config.model)
            .field("execution", &self.execution)
            .field("sampler", &self.sampler)
            .finish()
    }
}

fn observe(status: &Status, start: Instant) {
    metrics::observe(
        status.operation.name(),
        status.success,
        status.points,
        nanos_to_secs(start.elapsed().as_nanos()),
    );
}

fn display_value(value: Option<&Value>) -> String {
    value.map_or_else(|| "null".to_string(), Value::to_string)
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Int32(v) => u64::try_from(*v).ok(),
        Value::Int64(v) | Value::Timestamp(v) => u64::try_from(*v).ok(),
        Value::Float(v) => Some(*v as u64),
        Value::Double(v) => Some(*v as u64),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn verification(expected: Vec<(i64, Vec<Option<Value>>)>) -> Verification {
        Verification {
            sql: "SELECT s0, s1 FROM root.g1.d1 WHERE time = 1 OR time = 2".to_string(),
            expected: expected.into_iter().collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_verify_counts_matching_values() {
        let v = verification(vec![
            (1, vec![Some(Value::Int32(1)), Some(Value::Double(2.5))]),
            (2, vec![Some(Value::Int32(3)), None]),
        ]);
        let rows = vec![
            Row::new(1, vec![Some(Value::Int64(1)), Some(Value::Double(2.5))]),
            Row::new(2, vec![Some(Value::Int64(4)), None]),
        ];
        assert_eq!(Adapter::verify(&v, &rows), 2);
    }

    #[test]
    fn test_verify_tolerates_missing_rows() {
        let v = verification(vec![
            (1, vec![Some(Value::Int32(1))]),
            (2, vec![Some(Value::Int32(2))]),
        ]);
        let rows = vec![Row::new(2, vec![Some(Value::Int32(2))])];
        assert_eq!(Adapter::verify(&v, &rows), 1);
    }

    #[test]
    fn test_value_as_u64() {
        assert_eq!(value_as_u64(&Value::Int64(7)), Some(7));
        assert_eq!(value_as_u64(&Value::Text(" 12 ".into())), Some(12));
        assert_eq!(value_as_u64(&Value::Int32(-1)), None);
        assert_eq!(value_as_u64(&Value::Boolean(true)), None);
    }
}
