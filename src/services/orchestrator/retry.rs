//! Provider Retry
//!
//! Transient provider failures (rate limits, server errors, network errors,
//! timeouts) are retried with exponential backoff. Everything else returns
//! immediately.

use std::time::Duration;

use tracing::warn;
use tracker_assistant_llm::{
    LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, ToolDefinition,
};

use crate::models::settings::RetryPolicy;

/// Wait before retry number `attempt` (0-based).
///
/// `base * 2^attempt` capped at the policy maximum; a larger provider
/// `retry_after` wins.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32, retry_after_secs: Option<u32>) -> Duration {
    let exp = policy
        .base_delay_ms
        .saturating_mul(1u64 << attempt.min(20))
        .min(policy.max_delay_ms);
    let hinted = retry_after_secs.map_or(0, |s| u64::from(s) * 1000);
    Duration::from_millis(exp.max(hinted))
}

/// Send one model request, retrying transient failures.
pub async fn send_with_retry(
    provider: &dyn LlmProvider,
    policy: &RetryPolicy,
    messages: &[Message],
    system: &str,
    tools: &[ToolDefinition],
) -> LlmResult<LlmResponse> {
    let mut attempt = 0;
    loop {
        let result = provider
            .send_message(
                messages.to_vec(),
                Some(system.to_string()),
                tools.to_vec(),
                LlmRequestOptions::default(),
            )
            .await;
        match result {
            Ok(response) => return Ok(response),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let wait = backoff_delay(policy, attempt, e.retry_after_secs());
                warn!(
                    provider = provider.name(),
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    wait_ms = wait.as_millis() as u64,
                    error = %e,
                    "Retrying model call"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
