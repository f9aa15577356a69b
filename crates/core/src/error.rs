//! Core Error Types
//!
//! Defines the foundational error type shared by the domain model and the
//! gateway contract. Gateway implementations report every failure through
//! `CoreError` so the application layer can catch and sanitize it uniformly.

use thiserror::Error;

/// Core error type for the Tracker Assistant workspace.
///
/// This is also the error type of `DomainGateway`; the application crate maps
/// it into its own taxonomy (skill execution failures).
#[derive(Error, Debug)]
pub enum CoreError {
    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors (bad field values, empty names)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Parse errors (enum values, dates)
    #[error("Parse error: {0}")]
    Parse(String),

    /// The backing store or remote backend could not be reached
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
