use thiserror::Error;

use crate::domain::generation::GenerationId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Failures surfaced by an exchange adapter. Retried by the poll scheduler;
/// never fatal to other exchanges.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited by exchange")]
    RateLimited,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("exchange unreachable: {0}")]
    Unreachable(String),
}

impl AdapterError {
    /// Classify a transport error from the HTTP client.
    pub fn from_http(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else if err
            .status()
            .is_some_and(|s| s == reqwest::StatusCode::TOO_MANY_REQUESTS)
        {
            Self::RateLimited
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

/// Canonical symbol resolution errors. The offending instrument is excluded
/// from the generation and reported; it never aborts the exchange's cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("ambiguous mapping for {exchange}/{native_id}: {existing} conflicts with {incoming}")]
    AmbiguousMapping {
        exchange: String,
        native_id: String,
        existing: String,
        incoming: String,
    },

    #[error("unsupported instrument kind '{kind}' for {native_id}")]
    UnsupportedKind { native_id: String, kind: String },
}

/// Generation store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Another commit landed first; the caller must rebase against the new
    /// active generation and retry.
    #[error("commit conflict: expected parent generation {expected}, active is {actual}")]
    Conflict {
        expected: GenerationId,
        actual: GenerationId,
    },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt persisted state: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("commit retries exhausted for {exchange} after {attempts} attempts")]
    CommitRetriesExhausted { exchange: String, attempts: u32 },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
