//! LLM Provider Trait
//!
//! Defines the common interface for all LLM providers.

use async_trait::async_trait;

use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig, ToolDefinition,
};

/// Trait that all LLM providers must implement.
///
/// Provides a unified interface for:
/// - Single message completions (send_message)
/// - Health checking
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Send a message and get a complete response.
    ///
    /// # Arguments
    /// * `messages` - Conversation history
    /// * `system` - Optional system prompt
    /// * `tools` - Available tools for the model to use, already masked
    ///
    /// Implementations normalize tool schemas before sending them.
    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;

    /// Check if the provider is reachable and the API key is accepted.
    async fn health_check(&self) -> LlmResult<()>;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        408 => LlmError::Timeout {
            message: format!("{}: request timeout", provider),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: parse_retry_after(body),
        },
        400 | 422 => {
            let lower = body.to_lowercase();
            if lower.contains("context length") || lower.contains("too many tokens") {
                LlmError::ContextLengthExceeded {
                    message: body.to_string(),
                }
            } else {
                LlmError::InvalidRequest {
                    message: body.to_string(),
                }
            }
        }
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Extract a retry delay from a provider error body.
///
/// Gemini reports `"retryDelay": "12s"`; OpenAI-compatible servers sometimes
/// say "try again in 3s".
fn parse_retry_after(body: &str) -> Option<u32> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(details) = json["error"]["details"].as_array() {
            for detail in details {
                if let Some(delay) = detail["retryDelay"].as_str() {
                    if let Ok(secs) = delay.trim_end_matches('s').parse::<f64>() {
                        return Some(secs.ceil() as u32);
                    }
                }
            }
        }
    }
    let lower = body.to_lowercase();
    let idx = lower.find("try again in ")?;
    let rest = &lower[idx + "try again in ".len()..];
    let digits: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok().map(|s| s.ceil() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_error() {
        let err = missing_api_key_error("gemini");
        match err {
            LlmError::AuthenticationFailed { message } => {
                assert!(message.contains("gemini"));
            }
            _ => panic!("Expected AuthenticationFailed"),
        }
    }

    #[test]
    fn test_parse_http_error() {
        let err = parse_http_error(401, "unauthorized", "openai");
        assert!(matches!(err, LlmError::AuthenticationFailed { .. }));

        let err = parse_http_error(429, "rate limited", "openai");
        assert!(matches!(err, LlmError::RateLimited { retry_after: None, .. }));

        let err = parse_http_error(500, "internal error", "openai");
        assert!(matches!(err, LlmError::ServerError { .. }));

        let err = parse_http_error(400, "Invalid JSON payload: function_declarations", "gemini");
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_retry_after_from_gemini_body() {
        let body = r#"{"error":{"code":429,"details":[{"@type":"type.googleapis.com/google.rpc.RetryInfo","retryDelay":"12.4s"}]}}"#;
        let err = parse_http_error(429, body, "gemini");
        assert_eq!(err.retry_after_secs(), Some(13));
    }

    #[test]
    fn test_retry_after_from_text() {
        let err = parse_http_error(429, "Rate limit reached. Please try again in 2s.", "openai");
        assert_eq!(err.retry_after_secs(), Some(2));
    }
}
