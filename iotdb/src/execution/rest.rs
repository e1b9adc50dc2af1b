//! REST transport (`/rest/v2`)
//!
//! Stateless: every call is one JSON POST. Inserts ship a column-major
//! tablet, queries send `{"sql": ...}`. Only the tree model is served, and
//! executed text is never debug-sampled nor are rows captured for
//! comparison; see [`super::Capabilities`].

use super::{MetaTask, QueryOutcome, StatementSink};
use crate::config::AdapterConfig;
use crate::error::{AdapterError, TransportError};
use crate::model::ModelStrategy;
use crate::tablet::Tablet;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use tsbench_shared::{Batch, DeviceSchema, Row, Value};

const INSERT_TABLET_PATH: &str = "/rest/v2/insertTablet";
const QUERY_PATH: &str = "/rest/v2/query";
const NON_QUERY_PATH: &str = "/rest/v2/nonQuery";
const SUCCESS_CODE: i32 = 200;

pub struct RestStrategy {
    model: ModelStrategy,
    client: RestClient,
}

impl RestStrategy {
    pub fn new(config: &AdapterConfig, model: ModelStrategy) -> Result<Self, AdapterError> {
        let host = config.hosts.first().cloned().unwrap_or_default();
        let base_url = format!("http://{}:{}", host, config.rest.port);

        let mut headers = HeaderMap::new();
        let authorization = HeaderValue::from_str(&config.rest.authorization).map_err(|e| {
            AdapterError::Config(format!("invalid REST authorization header: {}", e))
        })?;
        headers.insert(AUTHORIZATION, authorization);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.rest.timeout_secs))
            .build()
            .map_err(|e| AdapterError::Connection(TransportError::Http(e)))?;

        Ok(Self {
            model,
            client: RestClient { http, base_url },
        })
    }

    pub(crate) async fn register(&mut self, schemas: &[DeviceSchema]) -> Result<(), AdapterError> {
        let statements = self.model.registration_statements(schemas);
        MetaTask::Register.run(&mut self.client, &statements).await
    }

    pub(crate) async fn cleanup(&mut self) -> Result<(), AdapterError> {
        let statements = self.model.cleanup_statements();
        MetaTask::Cleanup.run(&mut self.client, &statements).await
    }

    pub(crate) async fn insert(&mut self, batch: &Batch) -> Result<u64, AdapterError> {
        let tablet = self.model.tablet(batch);
        let request = InsertTabletRequest::from(&tablet);
        self.client
            .post(INSERT_TABLET_PATH, &request)
            .await
            .and_then(|(status, body)| check_envelope(status, &body))
            .map_err(|e| AdapterError::from_transport(tablet.target.as_str(), e))?;
        Ok(tablet.point_count())
    }

    /// Point count is the number of returned timestamps. A response without
    /// timestamps is a single aggregate row and counts as one.
    pub(crate) async fn query(&mut self, sql: &str) -> Result<QueryOutcome, AdapterError> {
        let response = self.run_query(sql).await?;
        let points = match &response.timestamps {
            Some(timestamps) => timestamps.len() as u64,
            None => 1,
        };
        Ok(QueryOutcome { points, rows: None })
    }

    pub(crate) async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Row>, AdapterError> {
        Ok(self.run_query(sql).await?.into_rows())
    }

    async fn run_query(&mut self, sql: &str) -> Result<QueryResponse, AdapterError> {
        let (status, body) = self
            .client
            .post(QUERY_PATH, &SqlRequest { sql })
            .await
            .map_err(|e| AdapterError::from_transport(sql, e))?;

        if !status.is_success() {
            return Err(AdapterError::from_transport(sql, rejection(status, &body)));
        }

        let response: QueryResponse =
            serde_json::from_str(&body).map_err(|e| AdapterError::MalformedResponse {
                text: sql.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(code) = response.code.filter(|code| *code != SUCCESS_CODE) {
            return Err(AdapterError::from_transport(
                sql,
                TransportError::Statement {
                    code,
                    message: response.message.unwrap_or_default(),
                },
            ));
        }
        Ok(response)
    }
}

struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(StatusCode, String), TransportError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "POST");
        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }
}

#[async_trait]
impl StatementSink for RestClient {
    async fn execute(&mut self, sql: &str) -> Result<(), TransportError> {
        let (status, body) = self.post(NON_QUERY_PATH, &SqlRequest { sql }).await?;
        check_envelope(status, &body)
    }
}

#[derive(Debug, Serialize)]
struct SqlRequest<'a> {
    sql: &'a str,
}

/// Body of `/rest/v2/insertTablet`
#[derive(Debug, Serialize)]
struct InsertTabletRequest<'a> {
    device: &'a str,
    is_aligned: bool,
    measurements: Vec<&'a str>,
    data_types: Vec<&'static str>,
    timestamps: &'a [i64],
    values: &'a [Vec<Option<Value>>],
}

impl<'a> From<&'a Tablet> for InsertTabletRequest<'a> {
    fn from(tablet: &'a Tablet) -> Self {
        Self {
            device: &tablet.target,
            is_aligned: tablet.aligned,
            measurements: tablet.measurements().collect(),
            data_types: tablet.columns.iter().map(|c| c.data_type.name()).collect(),
            timestamps: &tablet.timestamps,
            values: &tablet.values,
        }
    }
}

/// `{code, message}` envelope of inserts and non-queries
#[derive(Debug, Deserialize)]
struct RestStatus {
    code: i32,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    timestamps: Option<Vec<i64>>,
    /// `values[column][row]`
    #[serde(default)]
    values: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(default)]
    code: Option<i32>,
    #[serde(default)]
    message: Option<String>,
}

impl QueryResponse {
    /// Transpose column-major values into rows. Without timestamps every
    /// row gets timestamp 0.
    fn into_rows(self) -> Vec<Row> {
        let columns = self.values.unwrap_or_default();
        let row_count = match &self.timestamps {
            Some(timestamps) => timestamps.len(),
            None => columns.iter().map(Vec::len).max().unwrap_or(0),
        };
        (0..row_count)
            .map(|i| {
                let timestamp = self
                    .timestamps
                    .as_ref()
                    .and_then(|t| t.get(i).copied())
                    .unwrap_or(0);
                let fields = columns
                    .iter()
                    .map(|column| column.get(i).and_then(Value::from_json))
                    .collect();
                Row::new(timestamp, fields)
            })
            .collect()
    }
}

/// Failure for a non-2xx response, preferring the server's own envelope
fn rejection(status: StatusCode, body: &str) -> TransportError {
    match serde_json::from_str::<RestStatus>(body) {
        Ok(envelope) => TransportError::Statement {
            code: envelope.code,
            message: envelope.message.unwrap_or_default(),
        },
        Err(_) => TransportError::Statement {
            code: i32::from(status.as_u16()),
            message: body.to_string(),
        },
    }
}

/// Check the `{code, message}` envelope of an insert or non-query response.
/// A 2xx body that is not an envelope never reached the database.
fn check_envelope(status: StatusCode, body: &str) -> Result<(), TransportError> {
    if !status.is_success() {
        return Err(rejection(status, body));
    }
    let envelope: RestStatus =
        serde_json::from_str(body).map_err(|e| TransportError::Malformed(e.to_string()))?;
    if envelope.code != SUCCESS_CODE {
        return Err(TransportError::Statement {
            code: envelope.code,
            message: envelope.message.unwrap_or_default(),
        });
    }
    Ok(())
}
