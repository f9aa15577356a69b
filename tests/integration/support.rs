//! Shared fixtures for the integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use tracker_assistant::models::settings::{AppConfig, RetryPolicy};
use tracker_assistant::{DomainSnapshot, InMemoryGateway, Orchestrator, RateGuard};
use tracker_assistant_core::{Issue, IssueStatus, IssueType, Priority, Project};
use tracker_assistant_llm::{
    LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig,
    StopReason, ToolCall, ToolDefinition, UsageStats,
};

// ============================================================================
// Scripted provider
// ============================================================================

/// What the provider saw on one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: Option<String>,
    pub tool_names: Vec<String>,
    pub messages: Vec<Message>,
}

/// Provider that replays queued responses in order. Once the script runs
/// out it answers with a plain "Done." text reply.
pub struct ScriptedProvider {
    config: ProviderConfig,
    script: Mutex<VecDeque<LlmResult<LlmResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
    repeat_last: bool,
}

impl ScriptedProvider {
    pub fn new(script: Vec<LlmResult<LlmResponse>>) -> Self {
        Self {
            config: ProviderConfig::default(),
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            repeat_last: false,
        }
    }

    /// Keep returning the final scripted entry instead of running dry.
    pub fn repeating(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        _request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            system,
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            messages,
        });
        let mut script = self.script.lock().unwrap();
        if self.repeat_last && script.len() == 1 {
            return script.front().cloned().unwrap_or_else(|| Ok(text("Done.")));
        }
        script.pop_front().unwrap_or_else(|| Ok(text("Done.")))
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

// ============================================================================
// Responses
// ============================================================================

pub fn usage(input: u32, output: u32) -> UsageStats {
    UsageStats {
        input_tokens: input,
        output_tokens: output,
    }
}

pub fn text(body: &str) -> LlmResponse {
    LlmResponse {
        content: Some(body.to_string()),
        tool_calls: vec![],
        stop_reason: StopReason::EndTurn,
        usage: usage(100, 20),
        model: "scripted-model".to_string(),
    }
}

pub fn empty() -> LlmResponse {
    LlmResponse {
        content: None,
        tool_calls: vec![],
        stop_reason: StopReason::Safety,
        usage: usage(100, 0),
        model: "scripted-model".to_string(),
    }
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> LlmResponse {
    tool_calls(vec![(id, name, arguments)])
}

pub fn tool_calls(calls: Vec<(&str, &str, Value)>) -> LlmResponse {
    LlmResponse {
        content: None,
        tool_calls: calls
            .into_iter()
            .map(|(id, name, arguments)| ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments,
            })
            .collect(),
        stop_reason: StopReason::ToolUse,
        usage: usage(150, 30),
        model: "scripted-model".to_string(),
    }
}

pub fn network_error() -> LlmError {
    LlmError::NetworkError {
        message: "connection reset by peer".to_string(),
    }
}

// ============================================================================
// Domain fixtures
// ============================================================================

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
}

pub fn project() -> Project {
    Project {
        id: "p-1".to_string(),
        name: "Mobile App".to_string(),
        slug: "mobile-app".to_string(),
        prefix: "APP".to_string(),
        description: Some("Customer-facing mobile client".to_string()),
    }
}

pub fn issue(
    n: usize,
    issue_type: IssueType,
    status: IssueStatus,
    priority: Priority,
    category: &str,
) -> Issue {
    let ts = now() - Duration::days(10);
    Issue {
        id: format!("i-{}", n),
        project_id: "p-1".to_string(),
        milestone_id: None,
        display_id: format!("APP-{}", n),
        title: format!("Issue number {} in the mobile client", n),
        description: None,
        issue_type,
        status,
        priority: Some(priority),
        tags: vec![],
        category: if category.is_empty() {
            vec![]
        } else {
            vec![category.to_string()]
        },
        assignee_ids: vec![],
        due_date: None,
        estimate: None,
        created_at: ts,
        updated_at: ts,
    }
}

/// 20 open issues: 3 in review, 2 urgent bugs, 8 frontend and 7 backend
/// medium-priority features.
pub fn twenty_issues() -> Vec<Issue> {
    let mut issues = Vec::new();
    for n in 1..=3 {
        issues.push(issue(n, IssueType::Feature, IssueStatus::InReview, Priority::Medium, "FRONT"));
    }
    for n in 4..=5 {
        issues.push(issue(n, IssueType::Bug, IssueStatus::Todo, Priority::Urgent, "BACK"));
    }
    for n in 6..=13 {
        issues.push(issue(n, IssueType::Feature, IssueStatus::Todo, Priority::Medium, "FRONT"));
    }
    for n in 14..=20 {
        issues.push(issue(n, IssueType::Feature, IssueStatus::Backlog, Priority::Medium, "BACK"));
    }
    issues
}

pub fn snapshot() -> DomainSnapshot {
    DomainSnapshot {
        projects: vec![project()],
        issues: twenty_issues(),
        milestones: vec![],
    }
}

// ============================================================================
// Orchestrator wiring
// ============================================================================

/// Defaults with millisecond backoff so retry tests stay fast.
pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.orchestrator.retry = RetryPolicy {
        max_retries: 2,
        base_delay_ms: 1,
        max_delay_ms: 2,
    };
    config
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub provider: Arc<ScriptedProvider>,
    pub gateway: Arc<InMemoryGateway>,
    pub guard: Arc<RateGuard>,
}

pub fn harness(provider: ScriptedProvider, config: &AppConfig) -> Harness {
    let provider = Arc::new(provider);
    let gateway = Arc::new(InMemoryGateway::from_snapshot(snapshot()));
    let guard = Arc::new(RateGuard::new(config.guard.clone()));
    let orchestrator = Orchestrator::new(provider.clone(), gateway.clone(), guard.clone(), config);
    Harness {
        orchestrator,
        provider,
        gateway,
        guard,
    }
}
