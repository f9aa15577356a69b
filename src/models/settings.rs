//! Settings Models
//!
//! Application configuration stored in config.json. Every field has a
//! default so partial files load cleanly.

use serde::{Deserialize, Serialize};
use tracker_assistant_llm::ProviderConfig;

use crate::utils::locale::Locale;

/// Backoff policy for retryable provider failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Agentic loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Model rounds per turn.
    pub max_rounds: u32,
    pub retry: RetryPolicy,
    pub locale: Locale,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            retry: RetryPolicy::default(),
            locale: Locale::En,
        }
    }
}

/// Rate and budget ceilings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub per_minute: usize,
    pub per_hour: usize,
    /// Session token ceiling.
    pub token_ceiling: u64,
    /// Fraction of the ceiling at which a warning is emitted.
    pub warning_ratio: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            per_minute: 15,
            per_hour: 300,
            token_ceiling: 200_000,
            warning_ratio: 0.8,
        }
    }
}

/// History compression settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Histories at or below this length are left untouched.
    pub max_messages: usize,
    /// Messages kept verbatim at the start.
    pub preserve_head: usize,
    /// Messages kept verbatim at the end.
    pub preserve_tail: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_messages: 16,
            preserve_head: 2,
            preserve_tail: 6,
        }
    }
}

/// Approval gate settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Hold mutating skills until the user confirms.
    pub require_confirmation: bool,
}

/// Application configuration stored in config.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub orchestrator: OrchestratorConfig,
    pub guard: GuardConfig,
    pub summarizer: SummarizerConfig,
    pub approval: ApprovalConfig,
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub locale: Option<Locale>,
    pub max_rounds: Option<u32>,
    pub token_ceiling: Option<u64>,
    pub require_confirmation: Option<bool>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(model) = update.model {
            self.provider.model = model;
        }
        if let Some(api_key) = update.api_key {
            self.provider.api_key = Some(api_key);
        }
        if let Some(locale) = update.locale {
            self.orchestrator.locale = locale;
        }
        if let Some(max_rounds) = update.max_rounds {
            self.orchestrator.max_rounds = max_rounds;
        }
        if let Some(ceiling) = update.token_ceiling {
            self.guard.token_ceiling = ceiling;
        }
        if let Some(require) = update.require_confirmation {
            self.approval.require_confirmation = require;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.provider.model.trim().is_empty() {
            return Err("provider.model must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(format!(
                "provider.temperature must be between 0 and 2, got {}",
                self.provider.temperature
            ));
        }
        if self.orchestrator.max_rounds == 0 || self.orchestrator.max_rounds > 20 {
            return Err("orchestrator.max_rounds must be between 1 and 20".to_string());
        }
        let retry = &self.orchestrator.retry;
        if retry.base_delay_ms > retry.max_delay_ms {
            return Err("retry.base_delay_ms cannot exceed retry.max_delay_ms".to_string());
        }
        if self.guard.per_minute == 0 || self.guard.per_hour == 0 {
            return Err("guard rate ceilings must be positive".to_string());
        }
        if self.guard.per_minute > self.guard.per_hour {
            return Err("guard.per_minute cannot exceed guard.per_hour".to_string());
        }
        if self.guard.token_ceiling == 0 {
            return Err("guard.token_ceiling must be positive".to_string());
        }
        if !(self.guard.warning_ratio > 0.0 && self.guard.warning_ratio <= 1.0) {
            return Err("guard.warning_ratio must be in (0, 1]".to_string());
        }
        let s = &self.summarizer;
        if s.preserve_head + s.preserve_tail + 1 > s.max_messages {
            return Err(
                "summarizer.max_messages must exceed preserve_head + preserve_tail".to_string(),
            );
        }
        Ok(())
    }
}
