//! Conversation State Machine
//!
//! `transition` is a pure function from a context and an event to the next
//! context. It never fails; events that do not apply leave the context as is.
//!
//! `plan_proposed` holds exactly while a pending plan is cached. Entering
//! `error` discards the plan, so the user replans after an error streak.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::conversation::{
    ConversationContext, ConversationState, PendingPlan, SkillHistoryEntry,
};

/// Consecutive failures that force the `error` state.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

pub const PLANNING_SKILLS: &[&str] = &["plan_milestones", "adjust_milestone_plan"];
pub const APPLY_SKILL: &str = "apply_milestone_plan";

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationEvent {
    UserMessage {
        tokens: u64,
    },
    SkillStarted {
        name: String,
    },
    SkillCompleted {
        name: String,
        #[serde(default)]
        data: Option<Value>,
        #[serde(default)]
        summary: Option<String>,
    },
    SkillFailed {
        name: String,
        error: String,
    },
    AiResponse {
        input_tokens: u64,
        output_tokens: u64,
    },
    Error {
        message: String,
    },
    /// The user turned down skills held for approval.
    ApprovalDeclined,
    Reset,
}

/// Phase a skill moves the conversation into when it starts.
pub fn phase_for_skill(name: &str) -> Option<ConversationState> {
    match name {
        "plan_milestones" | "adjust_milestone_plan" => Some(ConversationState::Planning),
        "get_project_metrics" | "suggest_priorities" | "find_similar_issues" => {
            Some(ConversationState::Reporting)
        }
        "create_issue" | "update_issue" | "bulk_update_issues" | "add_comment"
        | "create_milestone" | "update_milestone" | "delete_milestone"
        | "apply_milestone_plan" => Some(ConversationState::Executing),
        _ => None,
    }
}

/// Compute the next context.
pub fn transition(ctx: &ConversationContext, event: &ConversationEvent) -> ConversationContext {
    let mut next = ctx.clone();

    match event {
        ConversationEvent::UserMessage { tokens } => {
            next.usage.add_tokens(*tokens, 0);
            next.usage.add_turn();
            // Any user message escapes error; the failure streak is kept.
            if matches!(next.state, ConversationState::Idle | ConversationState::Error) {
                next.state = ConversationState::Chatting;
            }
        }
        ConversationEvent::SkillStarted { name } => {
            next.usage.add_skill_call();
            if next.pending_plan.is_none() {
                if let Some(phase) = phase_for_skill(name) {
                    next.state = phase;
                }
            }
        }
        ConversationEvent::SkillCompleted {
            name,
            data,
            summary,
        } => {
            next.push_history(SkillHistoryEntry {
                skill_name: name.clone(),
                success: true,
                summary: summary.clone(),
            });
            next.error_count = 0;

            if name == APPLY_SKILL {
                next.pending_plan = None;
            } else if PLANNING_SKILLS.contains(&name.as_str()) {
                next.pending_plan = data.as_ref().and_then(parse_pending_plan);
                if next.pending_plan.is_none() {
                    debug!(skill = %name, "Planning result carried no usable plan");
                }
            }
            next.state = settled_state(&next);
        }
        ConversationEvent::SkillFailed { name, error } => {
            next.push_history(SkillHistoryEntry {
                skill_name: name.clone(),
                success: false,
                summary: Some(error.clone()),
            });
            next.error_count = next.error_count.saturating_add(1);
            // Below the streak limit the phase is kept, so the next round
            // still sees the planning or reporting tool set.
            if next.error_count >= MAX_CONSECUTIVE_FAILURES {
                enter_error(&mut next);
            }
        }
        ConversationEvent::AiResponse {
            input_tokens,
            output_tokens,
        } => {
            next.usage.add_tokens(*input_tokens, *output_tokens);
        }
        ConversationEvent::Error { message } => {
            debug!(error = %message, "Conversation forced into error");
            next.error_count = next.error_count.saturating_add(1);
            enter_error(&mut next);
        }
        ConversationEvent::ApprovalDeclined => {
            // Held skills never ran, so leave the phase they opened.
            if !matches!(next.state, ConversationState::Idle | ConversationState::Error) {
                next.state = settled_state(&next);
            }
        }
        ConversationEvent::Reset => return ConversationContext::default(),
    }

    next
}

/// Apply a sequence of events in order.
pub fn replay<'a>(
    ctx: &ConversationContext,
    events: impl IntoIterator<Item = &'a ConversationEvent>,
) -> ConversationContext {
    events
        .into_iter()
        .fold(ctx.clone(), |acc, event| transition(&acc, event))
}

fn settled_state(ctx: &ConversationContext) -> ConversationState {
    if ctx.pending_plan.is_some() {
        ConversationState::PlanProposed
    } else {
        ConversationState::Chatting
    }
}

fn enter_error(ctx: &mut ConversationContext) {
    ctx.pending_plan = None;
    ctx.state = ConversationState::Error;
}

/// A plan with at least one milestone, from planner or adjust output.
fn parse_pending_plan(data: &Value) -> Option<PendingPlan> {
    serde_json::from_value::<PendingPlan>(data.clone())
        .ok()
        .filter(|plan| !plan.milestones.is_empty())
}
