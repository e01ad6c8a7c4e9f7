//! Error types for the submission intake system.
//!
//! The pipeline itself never surfaces these: every failure inside `run()` or
//! `process()` is mapped onto the returned context. They exist for the edges
//! of the system, where configuration is loaded and backends are called.

use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntakeError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Enrichment error: {0}")]
    EnrichmentError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for IntakeError {
    fn from(error: serde_json::Error) -> Self {
        IntakeError::SerializationError(format!("JSON serialization error: {error}"))
    }
}

impl From<ConfigurationError> for IntakeError {
    fn from(error: ConfigurationError) -> Self {
        IntakeError::ConfigurationError(error.to_string())
    }
}

impl From<EnrichmentError> for IntakeError {
    fn from(error: EnrichmentError) -> Self {
        IntakeError::EnrichmentError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;

/// Failures reported by an enrichment backend.
///
/// The enrichment stage treats every variant the same way as an absent
/// result: the call is recorded as a circuit breaker failure and the
/// submission continues without enrichment data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnrichmentError {
    #[error("Enrichment backend unavailable: {0}")]
    Unavailable(String),
    #[error("Enrichment call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("Malformed enrichment response for {identifier}: {reason}")]
    MalformedResponse { identifier: String, reason: String },
}

impl EnrichmentError {
    /// Marker reason recorded on the submission context.
    pub fn marker_reason(&self) -> &'static str {
        match self {
            EnrichmentError::Timeout { .. } => "timeout",
            EnrichmentError::Unavailable(_) | EnrichmentError::MalformedResponse { .. } => {
                "backend_error"
            }
        }
    }
}
