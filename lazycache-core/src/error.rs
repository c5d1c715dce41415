//! Error types for lazycache operations

use thiserror::Error;

/// Failures raised while a producer runs.
///
/// These are captured once per cache entry and handed to every caller that
/// asks for the entry afterwards, so they must be cheap to clone.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProducerError {
    #[error("Producer failed: {reason}")]
    Failed { reason: String },

    #[error("Invalid argument at position {index}: {reason}")]
    InvalidArgument { index: usize, reason: String },

    #[error("Producer panicked: {message}")]
    Panicked { message: String },
}

impl ProducerError {
    /// Wrap any displayable error as a producer failure.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        ProducerError::Failed {
            reason: reason.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all lazycache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache for type {type_name} is already registered")]
    DuplicateRegistration { type_name: &'static str },

    #[error(
        "Producer {producer} accepts {required}..={total} arguments, but {supplied} were supplied"
    )]
    ArityMismatch {
        producer: &'static str,
        supplied: usize,
        required: usize,
        total: usize,
    },

    #[error("No cache registered for type {type_name}")]
    NotRegistered { type_name: &'static str },

    #[error("Materialization of {type_name} failed: {source}")]
    MaterializationFailure {
        type_name: &'static str,
        source: ProducerError,
    },

    #[error("Invalid collection state: {reason}")]
    InvalidState { reason: String },

    #[error("Type mismatch: expected collection of {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for lazycache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================
