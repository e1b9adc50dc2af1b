//! Error taxonomy for the adapter
//!
//! [`TransportError`] is what a transport client reports. [`AdapterError`]
//! is what the adapter surfaces: inside a failed [`crate::Status`] for steady
//! state operations, or as the `Err` of lifecycle and registration calls.

use thiserror::Error;

/// Status code the database uses when a series or table already exists.
const ALREADY_EXISTS_CODE: i32 = 300;
const ALREADY_KEYWORD: &str = "already";

/// Failure reported by a session, JDBC or HTTP client
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("statement rejected ({code}): {message}")]
    Statement { code: i32, message: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("session is not open")]
    NotOpen,
}

impl TransportError {
    /// Whether the failure only says the series/table/database is already
    /// there, which schema registration tolerates.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Statement { code, message } => {
                *code == ALREADY_EXISTS_CODE || message.contains(ALREADY_KEYWORD)
            }
            Self::Connection(message) => message.contains(ALREADY_KEYWORD),
            _ => false,
        }
    }

    /// Whether the failure happened before the request reached the database.
    pub fn is_connection(&self) -> bool {
        match self {
            Self::Connection(_) | Self::NotOpen => true,
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::Statement { .. } | Self::Malformed(_) => false,
        }
    }
}

/// Failure surfaced by the adapter
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("connection error: {0}")]
    Connection(#[source] TransportError),

    #[error("failed to execute `{text}`: {source}")]
    Execution {
        text: String,
        #[source]
        source: TransportError,
    },

    #[error("malformed response to `{text}`: {reason}")]
    MalformedResponse { text: String, reason: String },

    #[error("schema registration failed: {0}")]
    Registration(#[source] Box<AdapterError>),

    #[error("verification query has no records")]
    EmptyVerification,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AdapterError {
    /// Wrap a transport failure for the given statement, keeping connection
    /// failures distinguishable.
    pub fn from_transport(text: impl Into<String>, source: TransportError) -> Self {
        match source {
            source if source.is_connection() => Self::Connection(source),
            TransportError::Malformed(reason) => Self::MalformedResponse {
                text: text.into(),
                reason,
            },
            source => Self::Execution {
                text: text.into(),
                source,
            },
        }
    }

    /// The statement or target the failure is about, when one was sent
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Execution { text, .. } | Self::MalformedResponse { text, .. } => Some(text),
            _ => None,
        }
    }
}
