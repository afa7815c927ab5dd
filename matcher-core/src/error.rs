//! Error types for the matcher

use thiserror::Error;

/// Matcher-wide error type
#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Embedding provider error: {0}")]
    Embedding(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MatcherError {
    pub fn validation(msg: impl Into<String>) -> Self {
        MatcherError::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        MatcherError::Config(msg.into())
    }

    pub fn corpus(msg: impl Into<String>) -> Self {
        MatcherError::Corpus(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        MatcherError::Embedding(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        MatcherError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        MatcherError::Internal(msg.into())
    }
}

/// Result type alias for matcher operations
pub type MatcherResult<T> = Result<T, MatcherError>;
