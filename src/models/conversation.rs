//! Conversation Models
//!
//! Session-scoped conversation state. `ConversationContext` is the value the
//! state machine transforms; `ConversationSession` adds the message history
//! the orchestrator sends to the model.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracker_assistant_llm::Message;

use crate::models::planning::ProposedMilestone;

/// Skill history depth kept on the context.
pub const SKILL_HISTORY_LIMIT: usize = 5;

/// Phase of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    Chatting,
    Planning,
    PlanProposed,
    Executing,
    Reporting,
    Error,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::Chatting => "chatting",
            ConversationState::Planning => "planning",
            ConversationState::PlanProposed => "plan_proposed",
            ConversationState::Executing => "executing",
            ConversationState::Reporting => "reporting",
            ConversationState::Error => "error",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token and call counters for one session.
///
/// Fields are only changed through the `add_*` methods so that
/// `total_tokens == input_tokens + output_tokens` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UsageRecord")]
pub struct UsageCounters {
    input_tokens: u64,
    output_tokens: u64,
    total_tokens: u64,
    turn_count: u32,
    skill_calls: u32,
}

impl UsageCounters {
    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn skill_calls(&self) -> u32 {
        self.skill_calls
    }

    pub fn add_tokens(&mut self, input: u64, output: u64) {
        self.input_tokens = self.input_tokens.saturating_add(input);
        self.output_tokens = self.output_tokens.saturating_add(output);
        self.total_tokens = self.input_tokens.saturating_add(self.output_tokens);
    }

    pub fn add_turn(&mut self) {
        self.turn_count = self.turn_count.saturating_add(1);
    }

    pub fn add_skill_call(&mut self) {
        self.skill_calls = self.skill_calls.saturating_add(1);
    }
}

#[derive(Deserialize)]
struct UsageRecord {
    input_tokens: u64,
    output_tokens: u64,
    total_tokens: u64,
    #[serde(default)]
    turn_count: u32,
    #[serde(default)]
    skill_calls: u32,
}

impl TryFrom<UsageRecord> for UsageCounters {
    type Error = String;

    fn try_from(raw: UsageRecord) -> Result<Self, Self::Error> {
        if raw.input_tokens.checked_add(raw.output_tokens) != Some(raw.total_tokens) {
            return Err(format!(
                "total_tokens {} is not input_tokens {} plus output_tokens {}",
                raw.total_tokens, raw.input_tokens, raw.output_tokens
            ));
        }
        Ok(Self {
            input_tokens: raw.input_tokens,
            output_tokens: raw.output_tokens,
            total_tokens: raw.total_tokens,
            turn_count: raw.turn_count,
            skill_calls: raw.skill_calls,
        })
    }
}

/// A proposed plan awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPlan {
    pub project_id: String,
    /// Accepts planner output directly.
    #[serde(alias = "proposed_milestones")]
    pub milestones: Vec<ProposedMilestone>,
}

/// One entry of the bounded skill history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillHistoryEntry {
    pub skill_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// The state machine's value.
///
/// Deserialization checks that `plan_proposed` and a pending plan go
/// together and that the history fits its bound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ContextRecord")]
pub struct ConversationContext {
    pub(crate) state: ConversationState,
    pub(crate) usage: UsageCounters,
    pub(crate) pending_plan: Option<PendingPlan>,
    pub(crate) error_count: u32,
    pub(crate) skill_history: VecDeque<SkillHistoryEntry>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn usage(&self) -> &UsageCounters {
        &self.usage
    }

    pub fn pending_plan(&self) -> Option<&PendingPlan> {
        self.pending_plan.as_ref()
    }

    /// Consecutive skill failures (and forced errors) since the last success.
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn skill_history(&self) -> impl Iterator<Item = &SkillHistoryEntry> {
        self.skill_history.iter()
    }

    pub(crate) fn push_history(&mut self, entry: SkillHistoryEntry) {
        self.skill_history.push_back(entry);
        while self.skill_history.len() > SKILL_HISTORY_LIMIT {
            self.skill_history.pop_front();
        }
    }
}

#[derive(Deserialize)]
struct ContextRecord {
    state: ConversationState,
    usage: UsageCounters,
    #[serde(default)]
    pending_plan: Option<PendingPlan>,
    #[serde(default)]
    error_count: u32,
    #[serde(default)]
    skill_history: VecDeque<SkillHistoryEntry>,
}

impl TryFrom<ContextRecord> for ConversationContext {
    type Error = String;

    fn try_from(raw: ContextRecord) -> Result<Self, Self::Error> {
        let proposed = raw.state == ConversationState::PlanProposed;
        if proposed != raw.pending_plan.is_some() {
            return Err(format!(
                "state {} does not match pending plan presence ({})",
                raw.state,
                raw.pending_plan.is_some()
            ));
        }
        if raw.skill_history.len() > SKILL_HISTORY_LIMIT {
            return Err(format!(
                "skill history holds {} entries, the limit is {}",
                raw.skill_history.len(),
                SKILL_HISTORY_LIMIT
            ));
        }
        Ok(Self {
            state: raw.state,
            usage: raw.usage,
            pending_plan: raw.pending_plan,
            error_count: raw.error_count,
            skill_history: raw.skill_history,
        })
    }
}

/// A conversation: state plus the message history sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    pub context: ConversationContext,
    pub messages: Vec<Message>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            context: ConversationContext::new(),
            messages: Vec::new(),
        }
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_total_tracks_sum() {
        let mut usage = UsageCounters::default();
        usage.add_tokens(100, 0);
        usage.add_tokens(20, 45);
        assert_eq!(usage.input_tokens(), 120);
        assert_eq!(usage.output_tokens(), 45);
        assert_eq!(usage.total_tokens(), 165);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut ctx = ConversationContext::new();
        for i in 0..8 {
            ctx.push_history(SkillHistoryEntry {
                skill_name: format!("skill_{}", i),
                success: true,
                summary: None,
            });
        }
        let names: Vec<_> = ctx.skill_history().map(|e| e.skill_name.as_str()).collect();
        assert_eq!(names, vec!["skill_3", "skill_4", "skill_5", "skill_6", "skill_7"]);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&ConversationState::PlanProposed).unwrap();
        assert_eq!(json, "\"plan_proposed\"");
        assert_eq!(ConversationState::default(), ConversationState::Idle);
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        assert_ne!(ConversationSession::new().id, ConversationSession::new().id);
    }

    fn proposed_context() -> ConversationContext {
        let mut ctx = ConversationContext {
            state: ConversationState::PlanProposed,
            pending_plan: Some(PendingPlan {
                project_id: "p-1".to_string(),
                milestones: vec![],
            }),
            ..Default::default()
        };
        ctx.usage.add_tokens(40, 12);
        ctx
    }

    #[test]
    fn test_context_round_trips_through_json() {
        let ctx = proposed_context();
        let value = serde_json::to_value(&ctx).unwrap();
        let back: ConversationContext = serde_json::from_value(value).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn test_deserialization_rejects_broken_invariants() {
        let mut value = serde_json::to_value(proposed_context()).unwrap();
        value["state"] = serde_json::json!("chatting");
        let err = serde_json::from_value::<ConversationContext>(value).unwrap_err();
        assert!(err.to_string().contains("does not match pending plan"));

        let mut value = serde_json::to_value(ConversationContext::new()).unwrap();
        value["state"] = serde_json::json!("plan_proposed");
        assert!(serde_json::from_value::<ConversationContext>(value).is_err());

        let mut value = serde_json::to_value(proposed_context()).unwrap();
        value["usage"]["total_tokens"] = serde_json::json!(1);
        let err = serde_json::from_value::<ConversationContext>(value).unwrap_err();
        assert!(err.to_string().contains("total_tokens 1"));

        let mut value = serde_json::to_value(ConversationContext::new()).unwrap();
        let entry = serde_json::json!({"skill_name": "search_issues", "success": true});
        value["skill_history"] = serde_json::json!(vec![entry; SKILL_HISTORY_LIMIT + 1]);
        assert!(serde_json::from_value::<ConversationContext>(value).is_err());
    }
}
