//! Orchestrator Integration Tests
//!
//! Drives full conversation turns through the orchestrator with a scripted
//! model provider and the in-memory gateway:
//! - Text replies and tool-call rounds with results fed back
//! - The plan, confirm and apply flow across turns
//! - Approval holds, confirmation, decline and allow-always
//! - Degradation: schema errors, empty replies, transport failures
//! - Rate and budget guard outcomes, round limit, tool mask enforcement

use serde_json::json;

use tracker_assistant::models::settings::AppConfig;
use tracker_assistant::utils::locale::{Locale, Msg};
use tracker_assistant::services::orchestrator::MAX_MESSAGE_CHARS;
use tracker_assistant::{
    AppError, ConversationSession, ConversationState, TurnOutcome, TurnRequest,
};
use tracker_assistant_core::{DomainGateway, IssueStatus};
use tracker_assistant_llm::LlmError;

use crate::support::{
    config, empty, harness, network_error, now, snapshot, text, tool_call, tool_calls,
    ScriptedProvider,
};

fn turn(message: &str) -> TurnRequest {
    TurnRequest::new(message, snapshot()).at(now())
}

// ============================================================================
// Basic turns
// ============================================================================

#[tokio::test]
async fn test_text_reply_commits_session() {
    let h = harness(
        ScriptedProvider::new(vec![Ok(text("Hi! The Mobile App has 20 open issues."))]),
        &config(),
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("hello"))
        .await
        .unwrap();

    assert_eq!(response.text(), "Hi! The Mobile App has 20 open issues.");
    assert!(!response.degraded);
    assert!(response.skills_executed.is_empty());
    assert!(response.warnings.is_empty());
    assert_eq!(response.conversation_state, ConversationState::Chatting);
    assert_eq!(response.usage.turn_count, 1);
    assert_eq!(response.usage.output, 20);
    assert_eq!(session.messages.len(), 2, "user message plus assistant reply");
    assert_eq!(session.context.state(), ConversationState::Chatting);

    let calls = h.provider.calls();
    assert_eq!(calls.len(), 1);
    let system = calls[0].system.as_deref().unwrap_or_default();
    assert!(system.contains("Today is 2026-06-01."));
    assert!(system.contains("Mobile App"));
    assert_eq!(calls[0].tool_names.len(), 14, "default tool set");
    assert!(!calls[0].tool_names.contains(&"apply_milestone_plan".to_string()));
}

#[tokio::test]
async fn test_tool_round_feeds_results_back() {
    let h = harness(
        ScriptedProvider::new(vec![
            Ok(tool_call("c1", "search_issues", json!({"status": "in_review"}))),
            Ok(text("Three issues are waiting for review.")),
        ]),
        &config(),
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("what is in review?"))
        .await
        .unwrap();

    assert_eq!(response.text(), "Three issues are waiting for review.");
    assert_eq!(response.skills_executed.len(), 1);
    let search = &response.skills_executed[0];
    assert!(search.success, "{:?}", search.error);
    assert!(search.summary.starts_with("Found 3 issue(s)"), "{}", search.summary);

    // user, assistant tool use, tool result, final reply
    assert_eq!(session.messages.len(), 4);
    let calls = h.provider.calls();
    assert_eq!(calls.len(), 2);
    let last = calls[1].messages.last().unwrap();
    assert!(last.has_tool_traffic(), "second round sees the tool result");
}

#[tokio::test]
async fn test_plan_confirm_apply_across_turns() {
    let h = harness(
        ScriptedProvider::new(vec![
            Ok(tool_call("c1", "plan_milestones", json!({"project": "APP"}))),
            Ok(text("I propose four milestones. Shall I create them?")),
            Ok(tool_call("c2", "apply_milestone_plan", json!({}))),
            Ok(text("Done, the milestones are in place.")),
        ]),
        &config(),
    );
    let mut session = ConversationSession::new();

    let first = h
        .orchestrator
        .handle_turn(&mut session, turn("plan milestones for the app"))
        .await
        .unwrap();
    assert_eq!(first.conversation_state, ConversationState::PlanProposed);
    let plan = session.context.pending_plan().expect("plan is held for confirmation");
    assert_eq!(plan.milestones.len(), 4);
    assert!(h.gateway.snapshot().await.milestones.is_empty(), "planning writes nothing");

    let second = h
        .orchestrator
        .handle_turn(&mut session, turn("yes, go ahead"))
        .await
        .unwrap();
    assert_eq!(second.text(), "Done, the milestones are in place.");
    assert_eq!(second.conversation_state, ConversationState::Chatting);
    assert!(session.context.pending_plan().is_none());

    let calls = h.provider.calls();
    assert_eq!(calls.len(), 4);
    assert!(
        calls[1].tool_names.contains(&"apply_milestone_plan".to_string()),
        "a proposed plan switches to the confirmation tool set"
    );
    assert!(!calls[2].tool_names.contains(&"create_issue".to_string()));
    let system = calls[2].system.as_deref().unwrap_or_default();
    assert!(system.contains("Plan awaiting confirmation"));
    assert!(system.contains("Ready to Ship"));

    let stored = h.gateway.snapshot().await;
    assert_eq!(stored.milestones.len(), 4);
    assert!(
        stored.issues.iter().all(|i| i.milestone_id.is_some()),
        "every open issue is assigned"
    );
}

#[tokio::test]
async fn test_plan_overrun_adds_warning() {
    let h = harness(
        ScriptedProvider::new(vec![
            Ok(tool_call(
                "c1",
                "plan_milestones",
                json!({"project": "APP", "target_date": "2026-06-20"}),
            )),
            Ok(text("Here is the plan.")),
        ]),
        &config(),
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("plan for June 20"))
        .await
        .unwrap();

    assert_eq!(
        response.warnings,
        vec![Locale::En.format(Msg::PlanOverrun, &["23"])]
    );
}

#[tokio::test]
async fn test_skill_outside_mask_is_refused() {
    let h = harness(
        ScriptedProvider::new(vec![
            Ok(tool_call("c1", "apply_milestone_plan", json!({}))),
            Ok(text("There is no plan to apply yet.")),
        ]),
        &config(),
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("apply it"))
        .await
        .unwrap();

    assert_eq!(response.text(), "There is no plan to apply yet.");
    let refused = &response.skills_executed[0];
    assert!(!refused.success);
    assert_eq!(
        refused.error.as_deref(),
        Some("apply_milestone_plan is not available right now")
    );
    assert_eq!(session.context.error_count(), 1);
    assert!(h.gateway.snapshot().await.milestones.is_empty());
}

#[tokio::test]
async fn test_parallel_calls_run_in_order() {
    let h = harness(
        ScriptedProvider::new(vec![
            Ok(tool_calls(vec![
                ("c1", "list_projects", json!({})),
                ("c2", "add_comment", json!({"issue": "APP-4", "body": "Looking into it"})),
            ])),
            Ok(text("Commented on APP-4.")),
        ]),
        &config(),
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("comment on APP-4"))
        .await
        .unwrap();

    let names: Vec<&str> = response
        .skills_executed
        .iter()
        .map(|r| r.skill_name.as_str())
        .collect();
    assert_eq!(names, vec!["list_projects", "add_comment"]);
    assert!(response.skills_executed.iter().all(|r| r.success));
    assert_eq!(h.gateway.comments_for("i-4").await.len(), 1);
}

// ============================================================================
// Approval
// ============================================================================

fn confirming_config() -> AppConfig {
    let mut config = config();
    config.approval.require_confirmation = true;
    config
}

async fn issue_status(h: &crate::support::Harness, id: &str) -> IssueStatus {
    h.gateway
        .list_issues_by_project("p-1")
        .await
        .unwrap()
        .into_iter()
        .find(|i| i.id == id)
        .unwrap()
        .status
}

#[tokio::test]
async fn test_mutation_held_until_approved() {
    let h = harness(
        ScriptedProvider::new(vec![Ok(tool_call(
            "c1",
            "update_issue",
            json!({"issue": "APP-6", "status": "in_progress"}),
        ))]),
        &confirming_config(),
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("start APP-6"))
        .await
        .unwrap();

    let TurnOutcome::PendingApproval { text, pending } = &response.outcome else {
        panic!("expected a pending approval, got {:?}", response.outcome);
    };
    assert!(text.starts_with(Locale::En.text(Msg::PendingApproval)));
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].skill_name, "update_issue");
    assert_eq!(pending[0].call_id, "c1");
    assert_eq!(h.provider.call_count(), 1, "no further rounds while waiting");
    assert_eq!(issue_status(&h, "i-6").await, IssueStatus::Todo);

    let stored = h.gateway.snapshot().await;
    let approved = h
        .orchestrator
        .execute_approved(&mut session, pending, &stored)
        .await;
    assert_eq!(approved.text(), "- Updated APP-6 (status)");
    assert_eq!(issue_status(&h, "i-6").await, IssueStatus::InProgress);
}

#[tokio::test]
async fn test_declined_mutation_changes_nothing() {
    let h = harness(
        ScriptedProvider::new(vec![Ok(tool_call(
            "c1",
            "update_issue",
            json!({"issue": "APP-6", "status": "done"}),
        ))]),
        &confirming_config(),
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("close APP-6"))
        .await
        .unwrap();
    assert!(response.outcome.is_pending());
    assert_eq!(response.conversation_state, ConversationState::Executing);

    let declined = h.orchestrator.decline_pending(&mut session);
    assert_eq!(declined.text(), Locale::En.text(Msg::ApprovalDeclined));
    assert_eq!(issue_status(&h, "i-6").await, IssueStatus::Todo);
    assert_eq!(declined.conversation_state, ConversationState::Chatting);
    assert_eq!(session.context.state(), ConversationState::Chatting);
    assert_eq!(session.context.error_count(), 0, "a decline is not a failure");
}

#[tokio::test]
async fn test_allow_always_skips_later_confirmation() {
    let h = harness(
        ScriptedProvider::new(vec![
            Ok(tool_call(
                "c1",
                "update_issue",
                json!({"issue": "APP-7", "status": "in_progress"}),
            )),
            Ok(text("APP-7 is now in progress.")),
        ]),
        &confirming_config(),
    );
    let mut session = ConversationSession::new();
    h.orchestrator
        .approval()
        .allow_always(&session.id, "update_issue");

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("start APP-7"))
        .await
        .unwrap();

    assert!(!response.outcome.is_pending());
    assert_eq!(response.text(), "APP-7 is now in progress.");
    assert_eq!(issue_status(&h, "i-7").await, IssueStatus::InProgress);

    let old_id = session.id.clone();
    h.orchestrator.reset_session(&mut session);
    assert_ne!(session.id, old_id);
    assert!(session.messages.is_empty());
    assert_eq!(session.context.state(), ConversationState::Idle);
}

// ============================================================================
// Degradation
// ============================================================================

#[tokio::test]
async fn test_schema_error_answers_from_data() {
    let h = harness(
        ScriptedProvider::new(vec![Err(LlmError::ParseError {
            message: "unexpected token in function call".to_string(),
        })]),
        &config(),
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("how are we doing?"))
        .await
        .unwrap();

    assert!(response.degraded);
    assert!(response.text().starts_with(Locale::En.text(Msg::FallbackIntro)));
    assert!(response.text().contains("Mobile App: 20 issues, 20 open"));
    assert_eq!(h.provider.call_count(), 1, "schema errors are not retried");
}

#[tokio::test]
async fn test_empty_reply_answers_from_data() {
    let h = harness(ScriptedProvider::new(vec![Ok(empty())]), &config());
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("status?"))
        .await
        .unwrap();

    assert!(response.degraded);
    assert!(response.text().starts_with(Locale::En.text(Msg::FallbackIntro)));
    assert_eq!(session.messages.len(), 2);
}

#[tokio::test]
async fn test_transport_failure_retries_then_apologizes() {
    let h = harness(
        ScriptedProvider::new(vec![Err(network_error())]).repeating(),
        &config(),
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("hello"))
        .await
        .unwrap();

    assert!(response.degraded);
    assert_eq!(response.text(), Locale::En.text(Msg::TryAgain));
    assert_eq!(h.provider.call_count(), 3, "first attempt plus two retries");
}

#[tokio::test]
async fn test_transport_failure_enters_error_until_next_message() {
    let h = harness(
        ScriptedProvider::new(vec![
            Err(network_error()),
            Err(network_error()),
            Err(network_error()),
            Ok(text("Back online.")),
        ]),
        &config(),
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("hello"))
        .await
        .unwrap();
    assert_eq!(response.text(), Locale::En.text(Msg::TryAgain));
    assert_eq!(response.conversation_state, ConversationState::Error);
    assert_eq!(session.context.state(), ConversationState::Error);
    assert_eq!(session.context.error_count(), 1);

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("still there?"))
        .await
        .unwrap();
    assert_eq!(response.text(), "Back online.");
    assert_eq!(response.conversation_state, ConversationState::Chatting);
    assert_eq!(h.provider.call_count(), 4);
}

#[tokio::test]
async fn test_transient_failure_recovers_on_retry() {
    let h = harness(
        ScriptedProvider::new(vec![
            Err(LlmError::ServerError {
                message: "overloaded".to_string(),
                status: Some(503),
            }),
            Ok(text("Back online.")),
        ]),
        &config(),
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("hello"))
        .await
        .unwrap();

    assert!(!response.degraded);
    assert_eq!(response.text(), "Back online.");
    assert_eq!(h.provider.call_count(), 2);
}

#[tokio::test]
async fn test_transport_failure_is_localized() {
    let mut config = config();
    config.orchestrator.locale = Locale::Es;
    let h = harness(
        ScriptedProvider::new(vec![Err(network_error())]).repeating(),
        &config,
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("hola"))
        .await
        .unwrap();

    assert_eq!(response.text(), Locale::Es.text(Msg::TryAgain));
}

#[tokio::test]
async fn test_auth_failure_propagates_and_leaves_session() {
    let h = harness(
        ScriptedProvider::new(vec![Err(LlmError::AuthenticationFailed {
            message: "invalid key".to_string(),
        })]),
        &config(),
    );
    let mut session = ConversationSession::new();
    let before = session.clone();

    let result = h
        .orchestrator
        .handle_turn(&mut session, turn("hello"))
        .await;

    assert!(matches!(result, Err(AppError::Provider(_))));
    assert_eq!(session, before, "failed turns do not touch the session");
    assert_eq!(h.provider.call_count(), 1, "auth failures are not retried");
}

// ============================================================================
// Guard and limits
// ============================================================================

#[tokio::test]
async fn test_invalid_messages_are_rejected_up_front() {
    let h = harness(ScriptedProvider::new(vec![]), &config());
    let mut session = ConversationSession::new();
    let before = session.clone();

    let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
    for message in ["", "   \n\t ", long.as_str()] {
        let result = h
            .orchestrator
            .handle_turn(&mut session, turn(message))
            .await;
        assert!(
            matches!(result, Err(AppError::Validation(_))),
            "{} chars accepted",
            message.len()
        );
    }

    assert_eq!(session, before);
    assert_eq!(h.provider.call_count(), 0);
    assert_eq!(h.guard.recorded_calls(), 0);
}

#[tokio::test]
async fn test_rate_limit_rejects_turn() {
    let mut config = config();
    config.guard.per_minute = 1;
    let h = harness(ScriptedProvider::new(vec![Ok(text("First."))]), &config);
    let mut session = ConversationSession::new();

    h.orchestrator
        .handle_turn(&mut session, turn("one"))
        .await
        .unwrap();
    let result = h.orchestrator.handle_turn(&mut session, turn("two")).await;

    match result {
        Err(AppError::RateLimitExceeded { retry_after_ms }) => assert!(retry_after_ms > 0),
        other => panic!("expected a rate limit error, got {:?}", other),
    }
    assert_eq!(session.messages.len(), 2, "the rejected turn is not recorded");
    assert_eq!(h.guard.recorded_calls(), 1);
}

#[tokio::test]
async fn test_rate_limit_mid_turn_reports_progress() {
    let mut config = config();
    config.guard.per_minute = 1;
    let h = harness(
        ScriptedProvider::new(vec![
            Ok(tool_call("c1", "list_projects", json!({}))),
            Ok(text("unreachable")),
        ]),
        &config,
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("list projects"))
        .await
        .unwrap();

    assert_eq!(h.provider.call_count(), 1);
    assert!(response.text().starts_with("- Found 1 project(s): Mobile App (APP)"), "{}", response.text());
    assert_eq!(response.warnings.len(), 1);
    assert!(response.warnings[0].contains("too quickly"));
}

#[tokio::test]
async fn test_budget_exhaustion_rejects_turn() {
    let mut config = config();
    config.guard.token_ceiling = 100;
    let h = harness(ScriptedProvider::new(vec![Ok(text("First."))]), &config);
    let mut session = ConversationSession::new();

    h.orchestrator
        .handle_turn(&mut session, turn("one"))
        .await
        .unwrap();
    let result = h.orchestrator.handle_turn(&mut session, turn("two")).await;

    match result {
        Err(AppError::BudgetExceeded { used, limit }) => {
            assert_eq!(limit, 100);
            assert!(used >= 120);
        }
        other => panic!("expected a budget error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_budget_warning_once_per_turn() {
    let mut config = config();
    config.guard.token_ceiling = 1_000;
    config.guard.warning_ratio = 0.1;
    let h = harness(
        ScriptedProvider::new(vec![
            Ok(text("First.")),
            Ok(tool_call("c1", "list_projects", json!({}))),
            Ok(text("Second.")),
        ]),
        &config,
    );
    let mut session = ConversationSession::new();

    let first = h
        .orchestrator
        .handle_turn(&mut session, turn("one"))
        .await
        .unwrap();
    assert!(first.warnings.is_empty());

    let second = h
        .orchestrator
        .handle_turn(&mut session, turn("two"))
        .await
        .unwrap();
    assert_eq!(second.warnings.len(), 1, "{:?}", second.warnings);
    assert!(second.warnings[0].ends_with("% of its token budget."));
}

#[tokio::test]
async fn test_round_limit_summarizes_progress() {
    let mut config = config();
    config.orchestrator.max_rounds = 2;
    let h = harness(
        ScriptedProvider::new(vec![Ok(tool_call("c1", "list_projects", json!({})))]).repeating(),
        &config,
    );
    let mut session = ConversationSession::new();

    let response = h
        .orchestrator
        .handle_turn(&mut session, turn("keep going"))
        .await
        .unwrap();

    assert_eq!(h.provider.call_count(), 2);
    assert_eq!(response.skills_executed.len(), 2);
    assert!(response.text().starts_with(Locale::En.text(Msg::RoundLimit)));
    assert!(!response.degraded);
}
