//! Error types for the question answering pipeline
//!
//! Errors in this module are fatal for a submission: they are raised before
//! any completion request is sent. Per-chunk failures live in
//! [`crate::llm::ChunkError`] and never abort a run.

use crate::context::BudgetError;
use thiserror::Error;

/// Result type for fallible pipeline operations
pub type Result<T> = std::result::Result<T, QaError>;

/// Fatal pipeline errors
#[derive(Debug, Error)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Run cancelled")]
    Cancelled,
}

impl From<BudgetError> for QaError {
    fn from(err: BudgetError) -> Self {
        QaError::Configuration(err.to_string())
    }
}

impl From<::config::ConfigError> for QaError {
    fn from(err: ::config::ConfigError) -> Self {
        QaError::Configuration(err.to_string())
    }
}

impl QaError {
    /// Whether the error was caused by the submitted document rather than setup
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            QaError::UnsupportedFormat(_) | QaError::Decoding(_) | QaError::EmptyQuestion
        )
    }
}
