//! Budget & Rate Guard
//!
//! Process-wide call-rate window and per-session token ceiling, consulted
//! before every model invocation. One `RateGuard` is shared through `Arc` by
//! every orchestrator in the process.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::conversation::UsageCounters;
use crate::models::settings::GuardConfig;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    /// Time until the violated window frees a slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl RateDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_ms: None,
        }
    }

    fn deny(wait: Duration) -> Self {
        Self {
            allowed: false,
            retry_after_ms: Some(wait.as_millis().max(1) as u64),
        }
    }
}

/// Outcome of a budget check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetStatus {
    /// False once the ceiling is reached; no further model calls.
    pub ok: bool,
    /// Past the warning ratio but still under the ceiling.
    pub warning: bool,
    pub percent_used: f64,
}

/// Sliding-window rate limiter plus token budget
#[derive(Debug)]
pub struct RateGuard {
    config: GuardConfig,
    window: Mutex<VecDeque<Instant>>,
}

impl RateGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            window: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Check and, when allowed, record a call now.
    pub fn check_rate_limit(&self) -> RateDecision {
        self.check_rate_limit_at(Instant::now())
    }

    /// Check and record a call at `now`. Timestamps must not go backwards.
    pub fn check_rate_limit_at(&self, now: Instant) -> RateDecision {
        let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());

        while let Some(&oldest) = window.front() {
            if now.saturating_duration_since(oldest) >= HOUR {
                window.pop_front();
            } else {
                break;
            }
        }

        let mut wait: Option<Duration> = None;

        let in_last_minute = window
            .iter()
            .rev()
            .take_while(|&&t| now.saturating_duration_since(t) < MINUTE)
            .count();
        // A zero ceiling has no oldest call to wait for; it denies a full window.
        if in_last_minute >= self.config.per_minute {
            let minute_wait = window
                .get(window.len() - in_last_minute)
                .map_or(MINUTE, |&oldest| MINUTE - now.saturating_duration_since(oldest));
            wait = Some(minute_wait);
        }

        if window.len() >= self.config.per_hour {
            let hour_wait = window
                .front()
                .map_or(HOUR, |&oldest| HOUR - now.saturating_duration_since(oldest));
            wait = Some(wait.map_or(hour_wait, |w| w.max(hour_wait)));
        }

        match wait {
            Some(wait) => {
                warn!(
                    calls_last_minute = in_last_minute,
                    calls_last_hour = window.len(),
                    retry_after_ms = wait.as_millis() as u64,
                    "Rate limit reached"
                );
                RateDecision::deny(wait)
            }
            None => {
                window.push_back(now);
                RateDecision::allow()
            }
        }
    }

    /// Calls currently recorded in the hour window.
    pub fn recorded_calls(&self) -> usize {
        self.window.lock().map(|w| w.len()).unwrap_or_else(|e| e.into_inner().len())
    }

    /// Compare session usage against the token ceiling.
    pub fn check_budget(&self, usage: &UsageCounters) -> BudgetStatus {
        let ceiling = self.config.token_ceiling.max(1);
        let used = usage.total_tokens();
        let ratio = used as f64 / ceiling as f64;
        let ok = used < ceiling;
        let status = BudgetStatus {
            ok,
            warning: ok && ratio >= self.config.warning_ratio,
            percent_used: (ratio * 1000.0).round() / 10.0,
        };
        if !ok {
            warn!(used, ceiling, "Token budget exhausted");
        } else if status.warning {
            debug!(used, ceiling, "Token budget past warning threshold");
        }
        status
    }
}

impl Default for RateGuard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

/// Approximate token count: `ceil(chars / 3.5)`.
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    (chars * 2 + 6) / 7
}
