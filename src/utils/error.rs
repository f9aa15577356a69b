//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions.
//!
//! Only a few of these ever leave a conversation turn: rate-limit denials,
//! session-fatal budget exhaustion and unrecoverable provider failures. Skill
//! failures travel as data inside `SkillResult` instead.

use thiserror::Error;

use tracker_assistant_core::CoreError;
use tracker_assistant_llm::LlmError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Call-rate ceiling reached; the caller should wait `retry_after_ms`
    #[error("Rate limit exceeded, retry after {retry_after_ms} ms")]
    RateLimitExceeded { retry_after_ms: u64 },

    /// Session token ceiling reached
    #[error("Token budget exceeded: {used} of {limit} tokens used")]
    BudgetExceeded { used: u64, limit: u64 },

    /// Skill arguments failed validation
    #[error("Invalid arguments for {skill}: {message}")]
    SkillValidation { skill: String, message: String },

    /// Gateway or planner failure while running a skill
    #[error("Skill {skill} failed: {message}")]
    SkillExecution { skill: String, message: String },

    /// Model returned a payload that cannot be used (malformed, empty, rejected schema)
    #[error("Provider schema error: {0}")]
    ProviderSchema(String),

    /// Model provider unreachable after retries
    #[error("Provider transport error: {0}")]
    ProviderTransport(String),

    /// Unrecoverable provider failure (authentication, unknown model)
    #[error("Provider error: {0}")]
    Provider(LlmError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a skill validation error
    pub fn skill_validation(skill: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SkillValidation {
            skill: skill.into(),
            message: msg.into(),
        }
    }

    /// Create a skill execution error
    pub fn skill_execution(skill: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SkillExecution {
            skill: skill.into(),
            message: msg.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Errors that end the turn without a user-facing reply.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::RateLimitExceeded { .. }
                | AppError::BudgetExceeded { .. }
                | AppError::Provider(_)
                | AppError::Config(_)
        )
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        if err.is_fatal() {
            AppError::Provider(err)
        } else if err.is_schema_error() {
            AppError::ProviderSchema(err.to_string())
        } else if err.is_retryable() {
            AppError::ProviderTransport(err.to_string())
        } else {
            AppError::Provider(err)
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Serialization(e) => AppError::Serialization(e),
            CoreError::Validation(msg) | CoreError::Parse(msg) => AppError::Validation(msg),
            CoreError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Convert AppError to a string for callers that surface plain messages
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
