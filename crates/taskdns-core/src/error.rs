//! Error types for the TaskDNS system
//!
//! This module defines all error types used throughout the crate.
//!
//! Hard errors abort the whole pass. Unresolved orphans and excluded
//! records are diagnostics, not errors, and never surface here.

use thiserror::Error;

/// Result type alias for TaskDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the TaskDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Required configuration missing or malformed (raised before any I/O)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Task source-related errors
    #[error("Task source error: {0}")]
    TaskSource(String),

    /// Record store-related errors
    #[error("Record store error: {0}")]
    RecordStore(String),

    /// Fetching live task IPs or existing records failed
    #[error("Upstream fetch failed ({provider}): {message}")]
    Fetch {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Submitting the change batch failed
    #[error("Upstream apply failed ({provider}): {message}")]
    Apply {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a task source error
    pub fn task_source(msg: impl Into<String>) -> Self {
        Self::TaskSource(msg.into())
    }

    /// Create a record store error
    pub fn record_store(msg: impl Into<String>) -> Self {
        Self::RecordStore(msg.into())
    }

    /// Create an upstream fetch error
    pub fn fetch(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an upstream apply error
    pub fn apply(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Apply {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised before any I/O took place
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
