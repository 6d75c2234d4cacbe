//! Error types for the Recollect context memory system
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// Main error type for Recollect operations
#[derive(Error, Debug)]
pub enum RecollectError {
    /// Malformed entry detected before any remote call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Vector record carried no metadata
    #[error("Missing metadata on record: {0}")]
    MissingMetadata(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Entry/record transformation lost information
    #[error("Transform error: {0}")]
    Transform(String),

    /// Vector backend call failed (message carries the failing phase)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Entry not found
    #[error("Context entry not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Recollect operations
pub type Result<T> = std::result::Result<T, RecollectError>;

/// Convert anyhow::Error to RecollectError
impl From<anyhow::Error> for RecollectError {
    fn from(err: anyhow::Error) -> Self {
        RecollectError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RecollectError::NotFound("test-id".to_string());
        assert_eq!(err.to_string(), "Context entry not found: test-id");
    }

    #[test]
    fn test_phase_prefix_is_preserved() {
        let err = RecollectError::Backend("vector upsert failed: connection reset".to_string());
        assert!(err.to_string().contains("vector upsert failed"));
    }
}
