//! HTTP Client Factory
//!
//! Builds reqwest clients with the provider's outbound timeouts. The request
//! timeout bounds a whole model call; the connect timeout doubles as the
//! connectivity probe budget.

use std::time::Duration;

use crate::types::{LlmError, LlmResult, ProviderConfig};

/// Build a `reqwest::Client` with the configured timeouts.
pub fn build_http_client(config: &ProviderConfig) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(config.probe_timeout_secs.max(1)))
        .build()
        .map_err(|e| LlmError::Other {
            message: format!("failed to build HTTP client: {}", e),
        })
}

/// Timeout applied to health-check requests.
pub fn probe_timeout(config: &ProviderConfig) -> Duration {
    Duration::from_secs(config.probe_timeout_secs.max(1))
}
