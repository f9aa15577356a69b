//! Skill Dispatcher
//!
//! Runs one skill call end to end: argument validation, project and issue
//! resolution, the approval gate, exactly one gateway or planner operation,
//! and normalization into a `SkillResult`. `execute` never fails; every
//! problem, including a panic inside a handler, becomes a failed result.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use tracker_assistant_core::{
    CoreError, DomainGateway, Issue, IssueFilter, IssueUpdate, NewIssue, NewMilestone, Project,
};

use super::approval::ApprovalGate;
use super::args::{
    ApplyPlanArgs, CreateIssueArgs, CreateMilestoneArgs, PlanAdjustment, PlanArgs,
    PlannedMilestoneInput, SearchArgs, SimilarArgs, SkillCall,
};
use super::registry::SkillRegistry;
use super::resolver::ProjectResolver;
use super::sanitizer::sanitize_error;
use crate::models::conversation::{ConversationContext, PendingPlan};
use crate::models::skill::SkillResult;
use crate::models::snapshot::DomainSnapshot;
use crate::services::analysis::IssueAnalyzer;
use crate::services::conversation::{transition, ConversationEvent};
use crate::services::planning::{MilestonePlanner, PlanRequest};
use crate::utils::error::{AppError, AppResult};

/// Minimum similarity for find_similar_issues.
const SIMILAR_THRESHOLD: f64 = 0.2;
/// Display ids listed in a summary before eliding.
const SUMMARY_IDS: usize = 8;

/// Per-call inputs that are not skill arguments.
#[derive(Debug, Clone, Copy)]
pub struct DispatchEnv<'a> {
    pub session_id: &'a str,
    pub snapshot: &'a DomainSnapshot,
    pub now: DateTime<Utc>,
    /// Set when re-running calls the user already approved.
    pub bypass_approval: bool,
}

/// Executes skills against the domain gateway
pub struct SkillDispatcher {
    gateway: Arc<dyn DomainGateway>,
    registry: Arc<SkillRegistry>,
    approval: Arc<ApprovalGate>,
}

impl SkillDispatcher {
    pub fn new(
        gateway: Arc<dyn DomainGateway>,
        registry: Arc<SkillRegistry>,
        approval: Arc<ApprovalGate>,
    ) -> Self {
        Self {
            gateway,
            registry,
            approval,
        }
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    pub fn approval(&self) -> &ApprovalGate {
        &self.approval
    }

    /// Execute a skill and feed its outcome to the conversation state.
    ///
    /// Pending results only record the start; the side effect has not
    /// happened yet.
    pub async fn dispatch(
        &self,
        context: &mut ConversationContext,
        name: &str,
        arguments: &Value,
        env: &DispatchEnv<'_>,
    ) -> SkillResult {
        *context = transition(
            context,
            &ConversationEvent::SkillStarted {
                name: name.to_string(),
            },
        );
        let plan = context.pending_plan().cloned();
        let result = self.execute(name, arguments, env, plan.as_ref()).await;

        if !result.pending {
            let event = if result.success {
                ConversationEvent::SkillCompleted {
                    name: result.skill_name.clone(),
                    data: result.data.clone(),
                    summary: Some(result.summary.clone()),
                }
            } else {
                ConversationEvent::SkillFailed {
                    name: result.skill_name.clone(),
                    error: result.error.clone().unwrap_or_default(),
                }
            };
            *context = transition(context, &event);
        }
        result
    }

    /// Execute a skill. Never fails.
    pub async fn execute(
        &self,
        name: &str,
        arguments: &Value,
        env: &DispatchEnv<'_>,
        pending_plan: Option<&PendingPlan>,
    ) -> SkillResult {
        let started = Instant::now();

        let outcome = AssertUnwindSafe(self.run(name, arguments, env, pending_plan))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => SkillResult::err(name, Self::error_message(err)),
            Err(_) => {
                warn!(skill = %name, "Skill handler panicked");
                SkillResult::err(name, "internal error while running the skill")
            }
        };
        let result = Self::post_validate(name, result)
            .with_elapsed(started.elapsed().as_millis() as u64);

        info!(
            skill = %name,
            success = result.success,
            pending = result.pending,
            elapsed_ms = result.execution_time_ms,
            "Skill executed"
        );
        result
    }

    async fn run(
        &self,
        name: &str,
        arguments: &Value,
        env: &DispatchEnv<'_>,
        pending_plan: Option<&PendingPlan>,
    ) -> AppResult<SkillResult> {
        if !self.registry.contains(name) {
            return Err(AppError::skill_validation(name, "unknown skill"));
        }
        let call = SkillCall::parse(name, arguments)?;

        if !env.bypass_approval && self.approval.needs_approval(&self.registry, env.session_id, name) {
            debug!(skill = %name, "Holding skill for approval");
            return Ok(SkillResult::pending(name, arguments.clone()));
        }

        match call {
            SkillCall::SearchIssues(args) => self.search_issues(args, env).await,
            SkillCall::ListProjects => self.list_projects().await,
            SkillCall::ListMilestones { project } => self.list_milestones(project, env).await,
            SkillCall::GetProjectMetrics { project } => self.project_metrics(project, env).await,
            SkillCall::SuggestPriorities { project, limit } => {
                self.suggest_priorities(project, limit, env).await
            }
            SkillCall::FindSimilarIssues(args) => self.find_similar(args, env).await,
            SkillCall::CreateIssue(args) => self.create_issue(args, env).await,
            SkillCall::UpdateIssue { issue, update } => self.update_issue(issue, update, env).await,
            SkillCall::BulkUpdateIssues { issues, update } => {
                self.bulk_update(issues, update, env).await
            }
            SkillCall::AddComment { issue, body } => self.add_comment(issue, body, env).await,
            SkillCall::CreateMilestone(args) => self.create_milestone(args, env).await,
            SkillCall::UpdateMilestone {
                milestone_id,
                update,
            } => {
                let skill = "update_milestone";
                let milestone = self
                    .gateway
                    .update_milestone(&milestone_id, update)
                    .await
                    .map_err(|e| gateway_error(skill, e))?;
                let summary = format!("Updated milestone '{}'", milestone.name);
                Ok(SkillResult::ok(skill, to_data(&milestone), summary))
            }
            SkillCall::DeleteMilestone { milestone_id } => {
                let skill = "delete_milestone";
                let label = env
                    .snapshot
                    .milestones
                    .iter()
                    .find(|m| m.id == milestone_id)
                    .map(|m| format!("'{}'", m.name))
                    .unwrap_or_else(|| milestone_id.clone());
                self.gateway
                    .delete_milestone(&milestone_id)
                    .await
                    .map_err(|e| gateway_error(skill, e))?;
                Ok(SkillResult::ok(
                    skill,
                    json!({ "deleted": milestone_id }),
                    format!("Deleted milestone {}", label),
                ))
            }
            SkillCall::PlanMilestones(args) => self.plan_milestones(args, env).await,
            SkillCall::AdjustMilestonePlan(adjustment) => {
                self.adjust_plan(adjustment, pending_plan, env)
            }
            SkillCall::ApplyMilestonePlan(args) => self.apply_plan(args, pending_plan, env).await,
        }
    }

    // ========================================================================
    // Read skills
    // ========================================================================

    async fn search_issues(&self, args: SearchArgs, env: &DispatchEnv<'_>) -> AppResult<SkillResult> {
        let skill = "search_issues";
        let project_id = match &args.project {
            Some(reference) => Some(self.resolve_project(skill, Some(reference), &[], env).await?.id),
            None => None,
        };
        let filter = IssueFilter {
            project_id,
            text: args.text,
            status: args.status,
            priority: args.priority,
            category: args.category,
            limit: Some(args.limit),
        };
        let mut issues = self
            .gateway
            .search_issues(&filter)
            .await
            .map_err(|e| gateway_error(skill, e))?;
        issues.truncate(args.limit);

        let summary = if issues.is_empty() {
            "No issues matched".to_string()
        } else {
            format!("Found {} issue(s): {}", issues.len(), list_ids(&issues))
        };
        let data: Vec<Value> = issues.iter().map(issue_brief).collect();
        Ok(SkillResult::ok(skill, Value::Array(data), summary))
    }

    async fn list_projects(&self) -> AppResult<SkillResult> {
        let skill = "list_projects";
        let projects = self
            .gateway
            .list_projects()
            .await
            .map_err(|e| gateway_error(skill, e))?;
        let names: Vec<String> = projects
            .iter()
            .map(|p| format!("{} ({})", p.name, p.prefix))
            .collect();
        let summary = format!("Found {} project(s): {}", projects.len(), names.join(", "));
        Ok(SkillResult::ok(skill, to_data(&projects), summary))
    }

    async fn list_milestones(
        &self,
        project: Option<String>,
        env: &DispatchEnv<'_>,
    ) -> AppResult<SkillResult> {
        let skill = "list_milestones";
        let project = self.resolve_project(skill, project.as_deref(), &[], env).await?;
        let mut milestones = self
            .gateway
            .list_milestones_by_project(&project.id)
            .await
            .map_err(|e| gateway_error(skill, e))?;
        milestones.sort_by_key(|m| m.order);
        let summary = format!("{} has {} milestone(s)", project.name, milestones.len());
        Ok(SkillResult::ok(skill, to_data(&milestones), summary))
    }

    // ========================================================================
    // Analysis skills
    // ========================================================================

    async fn project_metrics(
        &self,
        project: Option<String>,
        env: &DispatchEnv<'_>,
    ) -> AppResult<SkillResult> {
        let skill = "get_project_metrics";
        let project = self.resolve_project(skill, project.as_deref(), &[], env).await?;
        let issues = self.project_issues(skill, &project.id, env).await?;
        let metrics = IssueAnalyzer::project_metrics(&project.id, &issues, env.now);
        let summary = format!(
            "{}: {} issues, {} open, {:.1} closed per week over 4 weeks",
            project.name, metrics.total, metrics.open, metrics.velocity.issues_per_week_4w
        );
        Ok(SkillResult::ok(skill, to_data(&metrics), summary))
    }

    async fn suggest_priorities(
        &self,
        project: Option<String>,
        limit: usize,
        env: &DispatchEnv<'_>,
    ) -> AppResult<SkillResult> {
        let skill = "suggest_priorities";
        let project = self.resolve_project(skill, project.as_deref(), &[], env).await?;
        let issues = self.project_issues(skill, &project.id, env).await?;
        let suggestions = IssueAnalyzer::suggest_priorities(&issues, env.now, limit);
        let summary = if suggestions.is_empty() {
            format!("{} has no open issues", project.name)
        } else {
            let ids: Vec<&str> = suggestions.iter().map(|s| s.display_id.as_str()).collect();
            format!("Top priorities in {}: {}", project.name, ids.join(", "))
        };
        Ok(SkillResult::ok(skill, to_data(&suggestions), summary))
    }

    async fn find_similar(&self, args: SimilarArgs, env: &DispatchEnv<'_>) -> AppResult<SkillResult> {
        let skill = "find_similar_issues";
        let (text, exclude, issue_project) = match &args.issue {
            Some(reference) => {
                let issue = self.resolve_issue(skill, reference, env).await?;
                let text = match &args.text {
                    Some(extra) => format!("{}\n{}", issue.text(), extra),
                    None => issue.text(),
                };
                (text, Some(issue.id.clone()), Some(issue.project_id.clone()))
            }
            None => (args.text.clone().unwrap_or_default(), None, None),
        };

        let candidates: Vec<Issue> = match (&args.project, issue_project) {
            (Some(reference), _) => {
                let project = self.resolve_project(skill, Some(reference), &[], env).await?;
                self.project_issues(skill, &project.id, env).await?
            }
            (None, Some(project_id)) => self.project_issues(skill, &project_id, env).await?,
            (None, None) => env.snapshot.issues.clone(),
        };

        let similar = IssueAnalyzer::find_similar(
            &text,
            &candidates,
            exclude.as_deref(),
            SIMILAR_THRESHOLD,
            args.limit,
        );
        let summary = if similar.is_empty() {
            "No similar issues found".to_string()
        } else {
            let items: Vec<String> = similar
                .iter()
                .map(|s| format!("{} ({:.2})", s.display_id, s.similarity))
                .collect();
            format!("Found {} similar issue(s): {}", similar.len(), items.join(", "))
        };
        Ok(SkillResult::ok(skill, to_data(&similar), summary))
    }

    // ========================================================================
    // Mutating skills
    // ========================================================================

    async fn create_issue(&self, args: CreateIssueArgs, env: &DispatchEnv<'_>) -> AppResult<SkillResult> {
        let skill = "create_issue";
        let hints = [args.title.as_str(), args.description.as_deref().unwrap_or_default()];
        let project = self
            .resolve_project(skill, args.project.as_deref(), &hints, env)
            .await?;
        let new_issue = NewIssue {
            project_id: project.id.clone(),
            title: args.title,
            description: args.description,
            issue_type: args.issue_type.unwrap_or_default(),
            status: args.status.unwrap_or_default(),
            priority: args.priority,
            tags: args.tags,
            category: args.category,
            milestone_id: None,
            due_date: args.due_date,
        };
        let issue = self
            .gateway
            .create_issue(new_issue)
            .await
            .map_err(|e| gateway_error(skill, e))?;
        let summary = format!("Created {} in {}", issue.headline(), project.name);
        Ok(SkillResult::ok(skill, to_data(&issue), summary))
    }

    async fn update_issue(
        &self,
        reference: String,
        update: IssueUpdate,
        env: &DispatchEnv<'_>,
    ) -> AppResult<SkillResult> {
        let skill = "update_issue";
        let issue = self.resolve_issue(skill, &reference, env).await?;
        let fields = changed_fields(&update).join(", ");
        let updated = self
            .gateway
            .update_issue(&issue.id, update)
            .await
            .map_err(|e| gateway_error(skill, e))?;
        let summary = format!("Updated {} ({})", updated.display_id, fields);
        Ok(SkillResult::ok(skill, to_data(&updated), summary))
    }

    async fn bulk_update(
        &self,
        references: Vec<String>,
        update: IssueUpdate,
        env: &DispatchEnv<'_>,
    ) -> AppResult<SkillResult> {
        let skill = "bulk_update_issues";
        let mut ids = Vec::with_capacity(references.len());
        let mut unknown = Vec::new();
        for reference in &references {
            match self.resolve_issue(skill, reference, env).await {
                Ok(issue) => {
                    if !ids.contains(&issue.id) {
                        ids.push(issue.id);
                    }
                }
                Err(_) => unknown.push(reference.as_str()),
            }
        }
        if !unknown.is_empty() {
            return Err(AppError::skill_validation(
                skill,
                format!("unknown issue(s): {}", unknown.join(", ")),
            ));
        }

        let fields = changed_fields(&update).join(", ");
        let updated = self
            .gateway
            .bulk_update_issues(&ids, update)
            .await
            .map_err(|e| gateway_error(skill, e))?;
        let summary = format!(
            "Updated {} issue(s) ({}): {}",
            updated.len(),
            fields,
            list_ids(&updated)
        );
        let data: Vec<Value> = updated.iter().map(issue_brief).collect();
        Ok(SkillResult::ok(skill, Value::Array(data), summary))
    }

    async fn add_comment(
        &self,
        reference: String,
        body: String,
        env: &DispatchEnv<'_>,
    ) -> AppResult<SkillResult> {
        let skill = "add_comment";
        let issue = self.resolve_issue(skill, &reference, env).await?;
        let comment = self
            .gateway
            .add_comment(&issue.id, &body)
            .await
            .map_err(|e| gateway_error(skill, e))?;
        let summary = format!("Commented on {}", issue.display_id);
        Ok(SkillResult::ok(skill, to_data(&comment), summary))
    }

    async fn create_milestone(
        &self,
        args: CreateMilestoneArgs,
        env: &DispatchEnv<'_>,
    ) -> AppResult<SkillResult> {
        let skill = "create_milestone";
        let hints = [args.name.as_str(), args.description.as_deref().unwrap_or_default()];
        let project = self
            .resolve_project(skill, args.project.as_deref(), &hints, env)
            .await?;
        let milestone = self
            .gateway
            .create_milestone(NewMilestone {
                project_id: project.id.clone(),
                name: args.name,
                description: args.description,
                target_date: args.target_date,
                order: None,
            })
            .await
            .map_err(|e| gateway_error(skill, e))?;
        let summary = format!("Created milestone '{}' in {}", milestone.name, project.name);
        Ok(SkillResult::ok(skill, to_data(&milestone), summary))
    }

    // ========================================================================
    // Planning skills
    // ========================================================================

    async fn plan_milestones(&self, args: PlanArgs, env: &DispatchEnv<'_>) -> AppResult<SkillResult> {
        let skill = "plan_milestones";
        let project = self.resolve_project(skill, args.project.as_deref(), &[], env).await?;
        let all_issues = self.project_issues(skill, &project.id, env).await?;
        let open: Vec<Issue> = all_issues.iter().filter(|i| i.is_open()).cloned().collect();

        let plan = MilestonePlanner::plan(&PlanRequest {
            project_id: &project.id,
            open_issues: &open,
            all_issues: Some(&all_issues),
            team_size: args.team_size,
            target_date: args.target_date,
            now: env.now,
        });

        let summary = if plan.proposed_milestones.is_empty() {
            format!("{} has no open issues to plan", project.name)
        } else {
            let parts: Vec<String> = plan
                .proposed_milestones
                .iter()
                .map(|m| format!("{} ({})", m.name, m.issue_ids.len()))
                .collect();
            format!(
                "Proposed {} milestone(s) for {} open issue(s) in {}: {}",
                plan.proposed_milestones.len(),
                open.len(),
                project.name,
                parts.join(", ")
            )
        };
        Ok(SkillResult::ok(skill, to_data(&plan), summary))
    }

    fn adjust_plan(
        &self,
        adjustment: PlanAdjustment,
        pending_plan: Option<&PendingPlan>,
        env: &DispatchEnv<'_>,
    ) -> AppResult<SkillResult> {
        let skill = "adjust_milestone_plan";
        let mut plan = pending_plan
            .cloned()
            .ok_or_else(|| AppError::skill_execution(skill, "no milestone plan has been proposed yet"))?;

        let summary = match adjustment {
            PlanAdjustment::MoveIssue { milestone, issue } => {
                let target = find_plan_milestone(&plan, &milestone)
                    .ok_or_else(|| unknown_milestone(skill, &milestone))?;
                let issue_id = env
                    .snapshot
                    .find_issue(&issue)
                    .map(|i| i.id.clone())
                    .unwrap_or_else(|| issue.clone());

                let source = plan
                    .milestones
                    .iter()
                    .position(|m| m.issue_ids.contains(&issue_id))
                    .ok_or_else(|| {
                        AppError::skill_validation(skill, format!("{} is not part of the plan", issue))
                    })?;
                if source != target {
                    let from = &mut plan.milestones[source];
                    let index = from.issue_ids.iter().position(|id| id == &issue_id).unwrap_or(0);
                    let id = from.issue_ids.remove(index);
                    let line = if index < from.issues_summary.len() {
                        from.issues_summary.remove(index)
                    } else {
                        issue.clone()
                    };
                    plan.milestones[target].issue_ids.push(id);
                    plan.milestones[target].issues_summary.push(line);
                    plan.milestones.retain(|m| !m.issue_ids.is_empty());
                    for (i, m) in plan.milestones.iter_mut().enumerate() {
                        m.order = i as i32 + 1;
                    }
                }
                let target_name = plan
                    .milestones
                    .iter()
                    .find(|m| m.issue_ids.contains(&issue_id))
                    .map(|m| m.name.clone())
                    .unwrap_or_default();
                format!("Moved {} to {}", issue, target_name)
            }
            PlanAdjustment::Rename { milestone, name } => {
                let index = find_plan_milestone(&plan, &milestone)
                    .ok_or_else(|| unknown_milestone(skill, &milestone))?;
                let old = std::mem::replace(&mut plan.milestones[index].name, name.clone());
                format!("Renamed '{}' to '{}'", old, name)
            }
            PlanAdjustment::Retarget {
                milestone,
                target_date,
            } => {
                let index = find_plan_milestone(&plan, &milestone)
                    .ok_or_else(|| unknown_milestone(skill, &milestone))?;
                plan.milestones[index].target_date = target_date;
                format!("'{}' now targets {}", plan.milestones[index].name, target_date)
            }
        };
        Ok(SkillResult::ok(skill, to_data(&plan), summary))
    }

    async fn apply_plan(
        &self,
        args: ApplyPlanArgs,
        pending_plan: Option<&PendingPlan>,
        env: &DispatchEnv<'_>,
    ) -> AppResult<SkillResult> {
        let skill = "apply_milestone_plan";
        let (milestones, plan_project) = match (args.milestones, pending_plan) {
            (Some(milestones), _) => (milestones, None),
            (None, Some(plan)) => (
                plan.milestones
                    .iter()
                    .map(|m| PlannedMilestoneInput {
                        name: m.name.clone(),
                        description: Some(m.description.clone()),
                        target_date: Some(m.target_date),
                        order: Some(m.order),
                        issue_ids: m.issue_ids.clone(),
                    })
                    .collect(),
                Some(plan.project_id.clone()),
            ),
            (None, None) => {
                return Err(AppError::skill_validation(
                    skill,
                    "no milestones given and no plan has been proposed",
                ))
            }
        };

        let project_id = match (&args.project, plan_project) {
            (Some(reference), _) => self.resolve_project(skill, Some(reference), &[], env).await?.id,
            (None, Some(project_id)) => project_id,
            (None, None) => {
                let first_issue = milestones
                    .iter()
                    .flat_map(|m| m.issue_ids.iter())
                    .find_map(|r| env.snapshot.find_issue(r));
                match first_issue {
                    Some(issue) => issue.project_id.clone(),
                    None => self.resolve_project(skill, None, &[], env).await?.id,
                }
            }
        };

        let mut report = ApplyReport::default();
        for (index, planned) in milestones.into_iter().enumerate() {
            let mut item = MilestoneApplyItem {
                name: planned.name.clone(),
                milestone_id: None,
                assigned: Vec::new(),
                failed: Vec::new(),
                error: None,
            };
            let created = self
                .gateway
                .create_milestone(NewMilestone {
                    project_id: project_id.clone(),
                    name: planned.name.clone(),
                    description: planned.description.clone(),
                    target_date: planned.target_date,
                    order: Some(planned.order.unwrap_or(index as i32 + 1)),
                })
                .await;

            match created {
                Ok(milestone) => {
                    report.milestones_created += 1;
                    for reference in &planned.issue_ids {
                        let issue_id = env
                            .snapshot
                            .find_issue(reference)
                            .map(|i| i.id.clone())
                            .unwrap_or_else(|| reference.clone());
                        let update = IssueUpdate {
                            milestone_id: Some(Some(milestone.id.clone())),
                            ..Default::default()
                        };
                        match self.gateway.update_issue(&issue_id, update).await {
                            Ok(issue) => item.assigned.push(issue.display_id),
                            Err(e) => {
                                warn!(skill, issue = %reference, "Issue assignment failed");
                                item.failed.push(ItemFailure {
                                    issue: reference.clone(),
                                    error: sanitize_error(&e.to_string()),
                                });
                            }
                        }
                    }
                    item.milestone_id = Some(milestone.id);
                }
                Err(e) => {
                    warn!(skill, milestone = %planned.name, "Milestone creation failed");
                    item.error = Some(sanitize_error(&e.to_string()));
                    item.failed = planned
                        .issue_ids
                        .iter()
                        .map(|r| ItemFailure {
                            issue: r.clone(),
                            error: "milestone was not created".to_string(),
                        })
                        .collect();
                }
            }
            report.issues_assigned += item.assigned.len();
            report.issues_failed += item.failed.len();
            report.milestones.push(item);
        }
        report.project_id = project_id;

        if report.milestones_created == 0 && !report.milestones.is_empty() {
            let reason = report
                .milestones
                .iter()
                .find_map(|m| m.error.clone())
                .unwrap_or_else(|| "no milestone could be created".to_string());
            return Err(AppError::skill_execution(skill, reason));
        }

        let mut summary = format!(
            "Created {} milestone(s) and assigned {} issue(s)",
            report.milestones_created, report.issues_assigned
        );
        if report.issues_failed > 0 {
            summary.push_str(&format!("; {} assignment(s) failed", report.issues_failed));
        }
        Ok(SkillResult::ok(skill, to_data(&report), summary))
    }

    // ========================================================================
    // Resolution helpers
    // ========================================================================

    async fn projects(&self, skill: &str, env: &DispatchEnv<'_>) -> AppResult<Vec<Project>> {
        if !env.snapshot.projects.is_empty() {
            return Ok(env.snapshot.projects.clone());
        }
        self.gateway
            .list_projects()
            .await
            .map_err(|e| gateway_error(skill, e))
    }

    async fn resolve_project(
        &self,
        skill: &str,
        reference: Option<&str>,
        hints: &[&str],
        env: &DispatchEnv<'_>,
    ) -> AppResult<Project> {
        let projects = self.projects(skill, env).await?;
        ProjectResolver::new(&projects)
            .resolve(reference, hints)
            .cloned()
            .map_err(|message| AppError::skill_validation(skill, message))
    }

    /// Snapshot issues for a project, loaded from the gateway when the
    /// snapshot has none.
    async fn project_issues(
        &self,
        skill: &str,
        project_id: &str,
        env: &DispatchEnv<'_>,
    ) -> AppResult<Vec<Issue>> {
        let issues: Vec<Issue> = env.snapshot.issues_for_project(project_id).cloned().collect();
        if !issues.is_empty() {
            return Ok(issues);
        }
        debug!(skill, project_id, "Loading project issues from gateway");
        self.gateway
            .list_issues_by_project(project_id)
            .await
            .map_err(|e| gateway_error(skill, e))
    }

    async fn resolve_issue(
        &self,
        skill: &str,
        reference: &str,
        env: &DispatchEnv<'_>,
    ) -> AppResult<Issue> {
        if let Some(issue) = env.snapshot.find_issue(reference) {
            return Ok(issue.clone());
        }
        let filter = IssueFilter {
            text: Some(reference.trim().to_string()),
            ..Default::default()
        };
        let found = self
            .gateway
            .search_issues(&filter)
            .await
            .map_err(|e| gateway_error(skill, e))?;
        let reference = reference.trim();
        found
            .into_iter()
            .find(|i| i.id == reference || i.display_id.eq_ignore_ascii_case(reference))
            .ok_or_else(|| AppError::skill_validation(skill, format!("unknown issue '{}'", reference)))
    }

    // ========================================================================
    // Result normalization
    // ========================================================================

    fn error_message(err: AppError) -> String {
        match err {
            AppError::SkillValidation { message, .. } => message,
            AppError::SkillExecution { message, .. } => sanitize_error(&message),
            other => sanitize_error(&other.to_string()),
        }
    }

    /// Every result leaves with a skill name, a summary and, when failed, an
    /// error message.
    fn post_validate(name: &str, mut result: SkillResult) -> SkillResult {
        if result.skill_name.trim().is_empty() {
            result.skill_name = name.to_string();
        }
        if !result.success && result.error.as_deref().map_or(true, |e| e.trim().is_empty()) {
            result.error = Some("unknown error".to_string());
        }
        if result.summary.trim().is_empty() {
            result.summary = if result.success {
                format!("{} completed", result.skill_name)
            } else {
                format!(
                    "{} failed: {}",
                    result.skill_name,
                    result.error.as_deref().unwrap_or("unknown error")
                )
            };
        }
        result
    }
}

/// Per-milestone outcome of a batch apply.
#[derive(Debug, Clone, Serialize)]
struct MilestoneApplyItem {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    milestone_id: Option<String>,
    assigned: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<ItemFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ItemFailure {
    issue: String,
    error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
struct ApplyReport {
    project_id: String,
    milestones_created: usize,
    issues_assigned: usize,
    issues_failed: usize,
    milestones: Vec<MilestoneApplyItem>,
}

fn gateway_error(skill: &str, err: CoreError) -> AppError {
    AppError::skill_execution(skill, sanitize_error(&err.to_string()))
}

fn unknown_milestone(skill: &str, reference: &str) -> AppError {
    AppError::skill_validation(skill, format!("no planned milestone named '{}'", reference))
}

/// Locate a plan milestone by name (case-insensitive) or 1-based order.
fn find_plan_milestone(plan: &PendingPlan, reference: &str) -> Option<usize> {
    let reference = reference.trim();
    plan.milestones
        .iter()
        .position(|m| m.name.eq_ignore_ascii_case(reference))
        .or_else(|| {
            reference
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1 && *n <= plan.milestones.len())
                .map(|n| n - 1)
        })
}

/// Serialize a payload, replacing failures with an error marker.
fn to_data<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "Unserializable skill payload");
        json!({ "error": "unserializable payload" })
    })
}

/// Compact issue view sent to the model.
fn issue_brief(issue: &Issue) -> Value {
    json!({
        "id": issue.id,
        "display_id": issue.display_id,
        "title": issue.title,
        "type": issue.issue_type,
        "status": issue.status,
        "priority": issue.priority,
        "category": issue.category,
        "tags": issue.tags,
        "milestone_id": issue.milestone_id,
    })
}

fn list_ids(issues: &[Issue]) -> String {
    let mut ids: Vec<String> = issues
        .iter()
        .take(SUMMARY_IDS)
        .map(|i| i.display_id.clone())
        .collect();
    if issues.len() > SUMMARY_IDS {
        ids.push(format!("and {} more", issues.len() - SUMMARY_IDS));
    }
    ids.join(", ")
}

fn changed_fields(update: &IssueUpdate) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if update.title.is_some() {
        fields.push("title");
    }
    if update.description.is_some() {
        fields.push("description");
    }
    if update.issue_type.is_some() {
        fields.push("type");
    }
    if update.status.is_some() {
        fields.push("status");
    }
    if update.priority.is_some() {
        fields.push("priority");
    }
    if update.tags.is_some() {
        fields.push("tags");
    }
    if update.category.is_some() {
        fields.push("category");
    }
    if update.milestone_id.is_some() {
        fields.push("milestone");
    }
    if update.due_date.is_some() {
        fields.push("due date");
    }
    fields
}
