//! Error types for the reconciliation pipeline and the binary.
//!
//! `ConversionError` never escapes the coordinator: its `Display` text is
//! recorded as a failed issue's `failureReason`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("consumer '{consumer}' failed to update: {source}")]
    ConsumerUpdate {
        consumer: String,
        #[source]
        source: ConsumerError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a result consumer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsumerError {
    #[error("consumer does not accept processed results")]
    Unsupported,

    #[error("{0}")]
    Rejected(String),
}

/// Why one rule failure could not become a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("File URI resolution failed")]
    FileResolution { path: String },

    #[error("Diagnostic creation failed: {0}")]
    DiagnosticCreation(String),
}
