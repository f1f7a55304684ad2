//! Error types for the featline system.

use crate::types::{ResourceKind, TimestampMs};
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the featline system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid or missing data).
    #[error("Data error: {0}")]
    Data(String),

    /// A resource fetch failed.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The primary hourly candle fetch failed; no feature table can be built.
    #[error("Primary resource {resource} failed: {source}")]
    PrimaryFetch {
        resource: ResourceKind,
        #[source]
        source: FetchError,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }
}

/// Classified failure of a paginated resource fetch.
///
/// A fetch that ends with one of these still hands back whatever records it
/// accumulated before the failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network or transport failure that persisted through every retry.
    #[error("transport failure after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },

    /// The remote API answered with a non-success status code.
    #[error("API returned retCode {code}: {message}")]
    Api { code: i64, message: String },

    /// A full page did not move the window start forward.
    #[error(
        "pagination stalled for {resource}: next start {next_start} <= current start {current_start}"
    )]
    PaginationStalled {
        resource: ResourceKind,
        current_start: TimestampMs,
        next_start: TimestampMs,
    },

    /// The fetch was stopped by its caller before the window was exhausted.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Create a single-attempt transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        FetchError::Transport {
            attempts: 1,
            message: msg.into(),
        }
    }

    /// Create an API status error.
    pub fn api(code: i64, msg: impl Into<String>) -> Self {
        FetchError::Api {
            code,
            message: msg.into(),
        }
    }

    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }
}

/// A raw record that could not be coerced into its canonical form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed record: field `{field}` {reason}")]
pub struct MalformedRecord {
    pub field: String,
    pub reason: String,
}

impl MalformedRecord {
    pub fn missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: "is absent".to_string(),
        }
    }

    pub fn not_numeric(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: "is not numeric".to_string(),
        }
    }
}
