//! Orchestrator Service
//!
//! Runs one conversation turn: up to `max_rounds` model calls, each with the
//! tool mask for the current phase, dispatching every requested skill and
//! feeding the results back. A turn ends on a text reply, on skills held for
//! approval, or when the round limit is hit.
//!
//! The turn works on a copy of the session and commits it only once an
//! outcome is known. Errors returned from `handle_turn` leave the session
//! untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use tracker_assistant_core::DomainGateway;
use tracker_assistant_llm::{LlmProvider, LlmResponse, Message, MessageContent, MessageRole};

use super::fallback::fallback_reply;
use super::prompts::system_prompt;
use super::retry::send_with_retry;
use crate::models::conversation::{ConversationContext, ConversationSession};
use crate::models::response::{OrchestratorResponse, PendingSkill, TurnOutcome, UsageSummary};
use crate::models::settings::{AppConfig, OrchestratorConfig};
use crate::models::skill::SkillResult;
use crate::models::snapshot::DomainSnapshot;
use crate::services::conversation::{transition, ConversationEvent, ConversationSummarizer};
use crate::services::guard::{estimate_tokens, RateGuard};
use crate::services::skills::{
    select_mask, ApprovalGate, DispatchEnv, SkillDispatcher, SkillRegistry, ToolMask,
};
use crate::utils::error::{AppError, AppResult};
use crate::utils::locale::{Locale, Msg};

// ============================================================================
// Requests
// ============================================================================

/// One user message plus the data it should be answered against.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    pub snapshot: DomainSnapshot,
    /// Force a tool mask instead of deriving it from the conversation phase.
    pub mask_override: Option<ToolMask>,
    pub now: DateTime<Utc>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>, snapshot: DomainSnapshot) -> Self {
        Self {
            message: message.into(),
            snapshot,
            mask_override: None,
            now: Utc::now(),
        }
    }

    pub fn with_mask(mut self, mask: ToolMask) -> Self {
        self.mask_override = Some(mask);
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

// ============================================================================
// Turn state
// ============================================================================

/// Working copy of a session for the duration of one turn.
struct TurnState {
    context: ConversationContext,
    messages: Vec<Message>,
    skills_executed: Vec<SkillResult>,
    warnings: Vec<String>,
    pending: Vec<PendingSkill>,
    budget_warned: bool,
}

impl TurnState {
    fn resume(session: &ConversationSession) -> Self {
        Self {
            context: session.context.clone(),
            messages: session.messages.clone(),
            skills_executed: Vec::new(),
            warnings: Vec::new(),
            pending: Vec::new(),
            budget_warned: false,
        }
    }

    fn reply(self, session: &mut ConversationSession, text: String, degraded: bool) -> OrchestratorResponse {
        self.commit(session, TurnOutcome::Reply { text }, degraded)
    }

    fn await_approval(self, session: &mut ConversationSession, text: String) -> OrchestratorResponse {
        let pending = self.pending.clone();
        self.commit(session, TurnOutcome::PendingApproval { text, pending }, false)
    }

    fn commit(
        mut self,
        session: &mut ConversationSession,
        outcome: TurnOutcome,
        degraded: bool,
    ) -> OrchestratorResponse {
        self.messages.push(Message::assistant(outcome.text()));
        let response = OrchestratorResponse {
            outcome,
            skills_executed: self.skills_executed,
            usage: UsageSummary::from(self.context.usage()),
            conversation_state: self.context.state(),
            warnings: self.warnings,
            degraded,
        };
        session.context = self.context;
        session.messages = self.messages;
        response
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Agentic loop over a model provider and the skill dispatcher
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    dispatcher: SkillDispatcher,
    guard: Arc<RateGuard>,
    summarizer: ConversationSummarizer,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Build an orchestrator from the app config. The guard is shared across
    /// every orchestrator in the process.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        gateway: Arc<dyn DomainGateway>,
        guard: Arc<RateGuard>,
        config: &AppConfig,
    ) -> Self {
        let dispatcher = SkillDispatcher::new(
            gateway,
            Arc::new(SkillRegistry::builtin()),
            Arc::new(ApprovalGate::new(config.approval.require_confirmation)),
        );
        Self {
            provider,
            dispatcher,
            guard,
            summarizer: ConversationSummarizer::new(config.summarizer.clone()),
            config: config.orchestrator.clone(),
        }
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    pub fn approval(&self) -> &ApprovalGate {
        self.dispatcher.approval()
    }

    pub fn locale(&self) -> Locale {
        self.config.locale
    }

    /// Process one user message. Empty or oversize messages are rejected
    /// before the session is touched.
    pub async fn handle_turn(
        &self,
        session: &mut ConversationSession,
        request: TurnRequest,
    ) -> AppResult<OrchestratorResponse> {
        validate_message(&request.message)?;
        let locale = self.config.locale;
        let session_id = session.id.clone();
        let mut turn = TurnState::resume(session);

        turn.context = transition(
            &turn.context,
            &ConversationEvent::UserMessage {
                tokens: estimate_tokens(&request.message),
            },
        );
        turn.messages.push(Message::user(request.message.as_str()));
        info!(session_id = %session_id, state = %turn.context.state(), "Turn started");

        let env = DispatchEnv {
            session_id: &session_id,
            snapshot: &request.snapshot,
            now: request.now,
            bypass_approval: false,
        };

        let max_rounds = self.config.max_rounds.max(1);
        for round in 0..max_rounds {
            // Guard: rate window, then token budget.
            let rate = self.guard.check_rate_limit();
            if !rate.allowed {
                let retry_after_ms = rate.retry_after_ms.unwrap_or(0);
                if round == 0 {
                    return Err(AppError::RateLimitExceeded { retry_after_ms });
                }
                let secs = retry_after_ms.div_ceil(1000).to_string();
                turn.warnings.push(locale.format(Msg::RateLimited, &[secs.as_str()]));
                let text = summaries_reply(locale, None, &turn.skills_executed);
                return Ok(turn.reply(session, text, false));
            }

            let budget = self.guard.check_budget(turn.context.usage());
            if !budget.ok {
                if round == 0 {
                    return Err(AppError::BudgetExceeded {
                        used: turn.context.usage().total_tokens(),
                        limit: self.guard.config().token_ceiling,
                    });
                }
                turn.warnings.push(locale.text(Msg::BudgetExhausted).to_string());
                let text = summaries_reply(locale, None, &turn.skills_executed);
                return Ok(turn.reply(session, text, false));
            }
            if budget.warning && !turn.budget_warned {
                turn.budget_warned = true;
                let percent = format!("{:.0}", budget.percent_used);
                turn.warnings.push(locale.format(Msg::BudgetWarning, &[percent.as_str()]));
            }

            let mask = request
                .mask_override
                .unwrap_or_else(|| select_mask(turn.context.state()));
            let tools = self.dispatcher.registry().definitions_for(mask.skills());
            let system = system_prompt(
                mask,
                &request.snapshot,
                request.now.date_naive(),
                locale,
                turn.context.pending_plan(),
            );
            if self.summarizer.should_summarize(turn.messages.len()) {
                turn.messages = self.summarizer.summarize(&turn.messages);
            }

            debug!(
                session_id = %session_id,
                round,
                mask = %mask,
                tools = tools.len(),
                messages = turn.messages.len(),
                "Calling model"
            );
            let result = send_with_retry(
                self.provider.as_ref(),
                &self.config.retry,
                &turn.messages,
                &system,
                &tools,
            )
            .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => match AppError::from(e) {
                    AppError::ProviderSchema(message) => {
                        warn!(session_id = %session_id, round, error = %message, "Unusable model response, answering from data");
                        let text = fallback_reply(locale, &turn.skills_executed, &request.snapshot, request.now);
                        return Ok(turn.reply(session, text, true));
                    }
                    AppError::ProviderTransport(message) => {
                        warn!(session_id = %session_id, round, error = %message, "Model unreachable after retries");
                        turn.context = transition(&turn.context, &ConversationEvent::Error { message });
                        let text = locale.text(Msg::TryAgain).to_string();
                        return Ok(turn.reply(session, text, true));
                    }
                    other => {
                        error!(session_id = %session_id, round, error = %other, "Model call failed");
                        return Err(other);
                    }
                },
            };

            turn.context = transition(
                &turn.context,
                &ConversationEvent::AiResponse {
                    input_tokens: u64::from(response.usage.input_tokens),
                    output_tokens: u64::from(response.usage.output_tokens),
                },
            );

            if response.is_empty() {
                warn!(session_id = %session_id, round, "Model returned an empty reply, answering from data");
                let text = fallback_reply(locale, &turn.skills_executed, &request.snapshot, request.now);
                return Ok(turn.reply(session, text, true));
            }

            if !response.has_tool_calls() {
                let text = response.text().unwrap_or_default().to_string();
                info!(
                    session_id = %session_id,
                    rounds = round + 1,
                    skills = turn.skills_executed.len(),
                    state = %turn.context.state(),
                    "Turn finished"
                );
                return Ok(turn.reply(session, text, false));
            }

            turn.messages.push(assistant_turn(&response));
            for call in &response.tool_calls {
                let result = if mask.allows(&call.name) {
                    self.dispatcher
                        .dispatch(&mut turn.context, &call.name, &call.arguments, &env)
                        .await
                } else {
                    warn!(skill = %call.name, mask = %mask, "Model called a skill outside the active tool set");
                    let result = SkillResult::err(
                        call.name.as_str(),
                        format!("{} is not available right now", call.name),
                    );
                    turn.context = transition(
                        &turn.context,
                        &ConversationEvent::SkillFailed {
                            name: call.name.clone(),
                            error: result.error.clone().unwrap_or_default(),
                        },
                    );
                    result
                };

                if result.pending {
                    turn.pending.push(PendingSkill {
                        call_id: call.id.clone(),
                        skill_name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    });
                }
                plan_warnings(locale, &result, &mut turn.warnings);
                turn.messages.push(Message::tool_result(
                    call.id.as_str(),
                    call.name.as_str(),
                    result.to_tool_content(),
                    !result.success,
                ));
                turn.skills_executed.push(result);
            }

            if !turn.pending.is_empty() {
                info!(session_id = %session_id, pending = turn.pending.len(), "Skills held for approval");
                let text = pending_text(locale, &turn.pending);
                return Ok(turn.await_approval(session, text));
            }
            if let Some(text) = response.text() {
                let text = text.to_string();
                return Ok(turn.reply(session, text, false));
            }
        }

        warn!(session_id = %session_id, max_rounds, "Round limit reached");
        let text = summaries_reply(locale, Some(Msg::RoundLimit), &turn.skills_executed);
        Ok(turn.reply(session, text, false))
    }

    /// Run skills the user confirmed, bypassing the approval gate.
    pub async fn execute_approved(
        &self,
        session: &mut ConversationSession,
        approved: &[PendingSkill],
        snapshot: &DomainSnapshot,
    ) -> OrchestratorResponse {
        let locale = self.config.locale;
        let session_id = session.id.clone();
        let mut turn = TurnState::resume(session);
        let env = DispatchEnv {
            session_id: &session_id,
            snapshot,
            now: Utc::now(),
            bypass_approval: true,
        };

        for item in approved {
            let result = self
                .dispatcher
                .dispatch(&mut turn.context, &item.skill_name, &item.arguments, &env)
                .await;
            plan_warnings(locale, &result, &mut turn.warnings);
            turn.skills_executed.push(result);
        }
        info!(session_id = %session_id, executed = approved.len(), "Approved skills executed");

        let lines: Vec<String> = turn
            .skills_executed
            .iter()
            .map(|r| outcome_line(locale, r))
            .collect();
        let text = if lines.is_empty() {
            locale.text(Msg::NothingToReport).to_string()
        } else {
            lines.join("\n")
        };
        turn.reply(session, text, false)
    }

    /// Record that the user declined the held skills.
    pub fn decline_pending(&self, session: &mut ConversationSession) -> OrchestratorResponse {
        let text = self.config.locale.text(Msg::ApprovalDeclined).to_string();
        let mut turn = TurnState::resume(session);
        turn.context = transition(&turn.context, &ConversationEvent::ApprovalDeclined);
        info!(session_id = %session.id, state = %turn.context.state(), "Held skills declined");
        turn.reply(session, text, false)
    }

    /// Replace the session with a fresh one and forget its approvals.
    pub fn reset_session(&self, session: &mut ConversationSession) {
        self.approval().clear_session(&session.id);
        *session = ConversationSession::new();
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Longest user message accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 50_000;

fn validate_message(message: &str) -> AppResult<()> {
    if message.trim().is_empty() {
        return Err(AppError::validation("message is empty"));
    }
    let chars = message.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        return Err(AppError::validation(format!(
            "message is {} characters, the limit is {}",
            chars, MAX_MESSAGE_CHARS
        )));
    }
    Ok(())
}

/// The assistant message that carried tool calls, echoed into history.
fn assistant_turn(response: &LlmResponse) -> Message {
    let mut content = Vec::with_capacity(response.tool_calls.len() + 1);
    if let Some(text) = response.text() {
        content.push(MessageContent::Text {
            text: text.to_string(),
        });
    }
    for call in &response.tool_calls {
        content.push(MessageContent::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.arguments.clone(),
        });
    }
    Message {
        role: MessageRole::Assistant,
        content,
    }
}

fn outcome_line(locale: Locale, result: &SkillResult) -> String {
    if result.success {
        format!("- {}", result.summary)
    } else {
        let error = result.error.as_deref().unwrap_or_default();
        format!("- {}", locale.format(Msg::SkillFailed, &[result.skill_name.as_str(), error]))
    }
}

fn summaries_reply(locale: Locale, intro: Option<Msg>, skills: &[SkillResult]) -> String {
    if skills.is_empty() {
        return locale.text(Msg::NothingToReport).to_string();
    }
    let lines: Vec<String> = skills.iter().map(|r| outcome_line(locale, r)).collect();
    match intro {
        Some(msg) => format!("{}\n{}", locale.text(msg), lines.join("\n")),
        None => lines.join("\n"),
    }
}

fn pending_text(locale: Locale, pending: &[PendingSkill]) -> String {
    let mut text = locale.text(Msg::PendingApproval).to_string();
    for item in pending {
        text.push_str(&format!("\n- {} {}", item.skill_name, item.arguments));
    }
    text
}

/// A plan that overruns its target date gets a localized warning.
fn plan_warnings(locale: Locale, result: &SkillResult, warnings: &mut Vec<String>) {
    if !result.success || result.skill_name != "plan_milestones" {
        return;
    }
    let overrun = result
        .data
        .as_ref()
        .and_then(|d| d.get("overrun_days"))
        .and_then(Value::as_i64);
    if let Some(days) = overrun {
        warnings.push(locale.format(Msg::PlanOverrun, &[days.to_string().as_str()]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracker_assistant_llm::{StopReason, ToolCall, UsageStats};

    #[test]
    fn test_assistant_turn_echoes_calls() {
        let response = LlmResponse {
            content: Some("Looking".to_string()),
            tool_calls: vec![ToolCall {
                id: "c1".to_string(),
                name: "list_projects".to_string(),
                arguments: json!({}),
            }],
            stop_reason: StopReason::ToolUse,
            usage: UsageStats::default(),
            model: "m".to_string(),
        };
        let message = assistant_turn(&response);
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.content.len(), 2);
        assert!(message.has_tool_traffic());
    }

    #[test]
    fn test_plan_overrun_warning_is_localized() {
        let result = SkillResult::ok("plan_milestones", json!({"overrun_days": 7}), "Proposed");
        let mut warnings = Vec::new();
        plan_warnings(Locale::Es, &result, &mut warnings);
        assert_eq!(
            warnings,
            vec!["El calendario propuesto termina 7 días después de la fecha objetivo."]
        );

        let other = SkillResult::ok("plan_milestones", json!({}), "Proposed");
        let mut none = Vec::new();
        plan_warnings(Locale::En, &other, &mut none);
        assert!(none.is_empty());
    }

    #[test]
    fn test_summaries_reply_lists_failures() {
        let skills = vec![
            SkillResult::ok("update_issue", json!({}), "Updated APP-3 (status)"),
            SkillResult::err("add_comment", "unknown issue 'APP-9'"),
        ];
        let text = summaries_reply(Locale::En, Some(Msg::RoundLimit), &skills);
        assert!(text.starts_with(Locale::En.text(Msg::RoundLimit)));
        assert!(text.contains("- Updated APP-3 (status)"));
        assert!(text.contains("- add_comment failed: unknown issue 'APP-9'"));
        assert_eq!(
            summaries_reply(Locale::En, None, &[]),
            Locale::En.text(Msg::NothingToReport)
        );
    }

    #[test]
    fn test_message_length_counts_characters() {
        assert!(validate_message("ñ".repeat(MAX_MESSAGE_CHARS).as_str()).is_ok());
        assert!(matches!(
            validate_message(&"a".repeat(MAX_MESSAGE_CHARS + 1)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(validate_message(" \n\t"), Err(AppError::Validation(_))));
    }
}
