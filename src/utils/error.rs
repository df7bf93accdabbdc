//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.
//!
//! Tracing itself has no error type: failures of a traced operation pass
//! through the tracer and the proxies untouched.

use thiserror::Error;

/// Errors that can occur while reading tracer configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Sample rate must be a positive integer, got 0")]
    ZeroSampleRate,

    #[error("Channel capacity must be greater than 0")]
    ZeroCapacity,
}

/// Errors that can occur during summary output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Not a call-path summary: {0}")]
    InvalidSummary(String),
}
