//! Response Types
//!
//! What a conversation turn returns to its caller.

use serde::{Deserialize, Serialize};

use crate::models::conversation::{ConversationState, UsageCounters};
use crate::models::skill::SkillResult;

/// A skill call held back by the approval gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSkill {
    pub call_id: String,
    pub skill_name: String,
    pub arguments: serde_json::Value,
}

/// How the turn ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Final text for the user.
    Reply { text: String },
    /// Mutations awaiting the user's confirmation.
    PendingApproval {
        text: String,
        pending: Vec<PendingSkill>,
    },
}

impl TurnOutcome {
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Reply { text } | TurnOutcome::PendingApproval { text, .. } => text,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TurnOutcome::PendingApproval { .. })
    }
}

/// Usage snapshot reported with a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub input: u64,
    pub output: u64,
    pub total: u64,
    pub turn_count: u32,
}

impl From<&UsageCounters> for UsageSummary {
    fn from(usage: &UsageCounters) -> Self {
        Self {
            input: usage.input_tokens(),
            output: usage.output_tokens(),
            total: usage.total_tokens(),
            turn_count: usage.turn_count(),
        }
    }
}

/// Result of one conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorResponse {
    pub outcome: TurnOutcome,
    pub skills_executed: Vec<SkillResult>,
    pub usage: UsageSummary,
    pub conversation_state: ConversationState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Text came from the no-model fallback or the transport failure message.
    #[serde(default)]
    pub degraded: bool,
}

impl OrchestratorResponse {
    pub fn text(&self) -> &str {
        self.outcome.text()
    }
}
