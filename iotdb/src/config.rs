//! Adapter configuration
//!
//! One [`AdapterConfig`] value is handed to [`crate::Adapter::new`] and
//! threaded to every component that needs it. Loading layers an optional
//! TOML file under `TSBENCH_*` environment variables.

use crate::error::AdapterError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tsbench_shared::SensorType;

/// Schema convention of the database under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataModel {
    /// Hierarchical, path-addressed series (`root.g1.d1.s0`)
    Tree,
    /// Relational tables with tag and field columns
    Table,
}

impl std::str::FromStr for DataModel {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tree" => Ok(DataModel::Tree),
            "table" => Ok(DataModel::Table),
            _ => Err(AdapterError::Config(format!(
                "unknown data model `{}` (expected `tree` or `table`)",
                s
            ))),
        }
    }
}

/// Transport used to reach the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Long-lived native protocol session
    Session,
    /// SQL text over a JDBC-style connection
    Jdbc,
    /// JSON over HTTP
    Rest,
}

impl std::str::FromStr for TransportKind {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "session" => Ok(TransportKind::Session),
            "jdbc" => Ok(TransportKind::Jdbc),
            "rest" => Ok(TransportKind::Rest),
            _ => Err(AdapterError::Config(format!(
                "unknown transport `{}` (expected `session`, `jdbc` or `rest`)",
                s
            ))),
        }
    }
}

/// How the session transport ships a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionInsertMode {
    /// One columnar tablet per batch
    #[default]
    Tablet,
    /// One call per record
    Record,
    /// One multi-record call per batch
    Records,
}

impl std::str::FromStr for SessionInsertMode {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tablet" => Ok(SessionInsertMode::Tablet),
            "record" => Ok(SessionInsertMode::Record),
            "records" => Ok(SessionInsertMode::Records),
            _ => Err(AdapterError::Config(format!(
                "unknown session insert mode `{}` (expected `tablet`, `record` or `records`)",
                s
            ))),
        }
    }
}

/// Encoding per sensor type, used when registering series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub boolean: String,
    pub int32: String,
    pub int64: String,
    pub float: String,
    pub double: String,
    pub text: String,
    pub string: String,
    pub blob: String,
    pub timestamp: String,
    pub date: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            boolean: "RLE".to_string(),
            int32: "TS_2DIFF".to_string(),
            int64: "TS_2DIFF".to_string(),
            float: "GORILLA".to_string(),
            double: "GORILLA".to_string(),
            text: "DICTIONARY".to_string(),
            string: "DICTIONARY".to_string(),
            blob: "PLAIN".to_string(),
            timestamp: "TS_2DIFF".to_string(),
            date: "TS_2DIFF".to_string(),
        }
    }
}

impl EncodingConfig {
    pub fn for_type(&self, sensor_type: SensorType) -> &str {
        match sensor_type {
            SensorType::Boolean => &self.boolean,
            SensorType::Int32 => &self.int32,
            SensorType::Int64 => &self.int64,
            SensorType::Float => &self.float,
            SensorType::Double => &self.double,
            SensorType::Text => &self.text,
            SensorType::String => &self.string,
            SensorType::Blob => &self.blob,
            SensorType::Timestamp => &self.timestamp,
            SensorType::Date => &self.date,
        }
    }
}

/// Probabilistic `debug` prefix on executed queries
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSampling {
    pub enabled: bool,

    /// Probability in `[0, 1]` that one query is sampled
    pub ratio: f64,
}

/// REST transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    pub port: u16,

    /// Value of the `Authorization` header
    pub authorization: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            port: 18080,
            authorization: "Basic cm9vdDpyb290".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Full adapter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Naming convention / data model
    pub model: DataModel,

    /// Execution strategy
    pub transport: TransportKind,

    /// Insert call shape for the session transport
    pub session_insert_mode: SessionInsertMode,

    pub hosts: Vec<String>,
    pub ports: Vec<u16>,
    pub username: String,
    pub password: String,

    /// Database name. Optional prefix segment in the tree model, required
    /// in the table model.
    pub database: Option<String>,

    /// Register aligned series and send aligned inserts
    pub sensor_alignment: bool,

    pub encodings: EncodingConfig,
    pub compressor: String,

    pub debug_sampling: DebugSampling,

    /// Capture raw result rows for cross-run comparison
    pub comparison: bool,

    /// Suppress per-query SQL logging
    pub quiet: bool,

    /// Seed of the debug-sampling random source
    pub seed: u64,

    /// Run schema registration before writes
    pub create_schema: bool,

    /// Ask the session transport to compress its wire protocol
    pub thrift_compression: bool,

    pub rest: RestConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            model: DataModel::Tree,
            transport: TransportKind::Session,
            session_insert_mode: SessionInsertMode::Tablet,
            hosts: vec!["127.0.0.1".to_string()],
            ports: vec![6667],
            username: "root".to_string(),
            password: "root".to_string(),
            database: None,
            sensor_alignment: true,
            encodings: EncodingConfig::default(),
            compressor: "LZ4".to_string(),
            debug_sampling: DebugSampling::default(),
            comparison: false,
            quiet: false,
            seed: 666,
            create_schema: true,
            thrift_compression: false,
            rest: RestConfig::default(),
        }
    }
}

impl AdapterConfig {
    /// Load configuration from an optional TOML file, then `TSBENCH_*`
    /// environment variables (nested keys separated by `__`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TSBENCH")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("hosts")
                .with_list_parse_key("ports"),
        );

        let config: AdapterConfig = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), AdapterError> {
        let ratio = self.debug_sampling.ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(AdapterError::Config(format!(
                "debug sampling ratio must be within [0, 1], got {}",
                ratio
            )));
        }

        if self.hosts.is_empty() {
            return Err(AdapterError::Config("at least one host is required".to_string()));
        }

        if self.ports.len() != self.hosts.len() {
            return Err(AdapterError::Config(format!(
                "{} host(s) but {} port(s) configured",
                self.hosts.len(),
                self.ports.len()
            )));
        }

        if self.model == DataModel::Table {
            if self.database.as_deref().map_or(true, str::is_empty) {
                return Err(AdapterError::Config(
                    "the table model requires `database`".to_string(),
                ));
            }
            if self.transport == TransportKind::Rest {
                return Err(AdapterError::Config(
                    "the REST transport only supports the tree model".to_string(),
                ));
            }
            if self.transport == TransportKind::Session
                && self.session_insert_mode != SessionInsertMode::Tablet
            {
                return Err(AdapterError::Config(
                    "the table model only inserts through tablets".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// `host:port` for every configured node
    pub fn node_urls(&self) -> Vec<String> {
        self.hosts
            .iter()
            .zip(&self.ports)
            .map(|(host, port)| format!("{}:{}", host, port))
            .collect()
    }

    /// Probability of debug-sampling one query, zero when disabled
    pub fn debug_ratio(&self) -> f64 {
        if self.debug_sampling.enabled {
            self.debug_sampling.ratio
        } else {
            0.0
        }
    }
}
