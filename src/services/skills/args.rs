//! Skill Arguments
//!
//! Models send loosely typed JSON. `SkillCall::parse` turns it into one typed
//! variant per skill: list fields accept arrays or comma-separated strings,
//! enums are checked against their value sets, dates must be `YYYY-MM-DD`,
//! and a missing required field is reported by name.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracker_assistant_core::{IssueStatus, IssueType, IssueUpdate, MilestoneUpdate, Priority};

use crate::utils::error::{AppError, AppResult};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchArgs {
    pub project: Option<String>,
    pub text: Option<String>,
    pub status: Vec<IssueStatus>,
    pub priority: Vec<Priority>,
    pub category: Vec<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarArgs {
    pub text: Option<String>,
    pub issue: Option<String>,
    pub project: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateIssueArgs {
    pub project: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub issue_type: Option<IssueType>,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub category: Vec<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateMilestoneArgs {
    pub project: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanArgs {
    pub project: Option<String>,
    pub team_size: usize,
    pub target_date: Option<NaiveDate>,
}

/// One edit to the pending plan. `milestone` is a name or 1-based order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanAdjustment {
    MoveIssue { milestone: String, issue: String },
    Rename { milestone: String, name: String },
    Retarget { milestone: String, target_date: NaiveDate },
}

/// A milestone in an explicit batch-apply payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedMilestoneInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub order: Option<i32>,
    pub issue_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyPlanArgs {
    pub project: Option<String>,
    /// `None` applies the cached pending plan.
    pub milestones: Option<Vec<PlannedMilestoneInput>>,
}

/// A validated skill invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "skill", rename_all = "snake_case")]
pub enum SkillCall {
    SearchIssues(SearchArgs),
    ListProjects,
    ListMilestones { project: Option<String> },
    GetProjectMetrics { project: Option<String> },
    SuggestPriorities { project: Option<String>, limit: usize },
    FindSimilarIssues(SimilarArgs),
    CreateIssue(CreateIssueArgs),
    UpdateIssue { issue: String, update: IssueUpdate },
    BulkUpdateIssues { issues: Vec<String>, update: IssueUpdate },
    AddComment { issue: String, body: String },
    CreateMilestone(CreateMilestoneArgs),
    UpdateMilestone { milestone_id: String, update: MilestoneUpdate },
    DeleteMilestone { milestone_id: String },
    PlanMilestones(PlanArgs),
    AdjustMilestonePlan(PlanAdjustment),
    ApplyMilestonePlan(ApplyPlanArgs),
}

impl SkillCall {
    /// Validate raw model arguments for `name`.
    pub fn parse(name: &str, arguments: &Value) -> AppResult<SkillCall> {
        let args = Args::new(name, arguments)?;
        let call = match name {
            "search_issues" => SkillCall::SearchIssues(SearchArgs {
                project: args.opt_str("project"),
                text: args.opt_str("text"),
                status: args.enum_list("status")?,
                priority: args.enum_list("priority")?,
                category: args.string_set("category")?,
                limit: args.limit("limit", DEFAULT_SEARCH_LIMIT)?,
            }),
            "list_projects" => SkillCall::ListProjects,
            "list_milestones" => SkillCall::ListMilestones {
                project: args.opt_str("project"),
            },
            "get_project_metrics" => SkillCall::GetProjectMetrics {
                project: args.opt_str("project"),
            },
            "suggest_priorities" => SkillCall::SuggestPriorities {
                project: args.opt_str("project"),
                limit: args.limit("limit", DEFAULT_SUGGESTION_LIMIT)?,
            },
            "find_similar_issues" => {
                let similar = SimilarArgs {
                    text: args.opt_str("text"),
                    issue: args.opt_str("issue"),
                    project: args.opt_str("project"),
                    limit: args.limit("limit", DEFAULT_SUGGESTION_LIMIT)?,
                };
                if similar.text.is_none() && similar.issue.is_none() {
                    return Err(args.error("either 'text' or 'issue' is required"));
                }
                SkillCall::FindSimilarIssues(similar)
            }
            "create_issue" => SkillCall::CreateIssue(CreateIssueArgs {
                project: args.opt_str("project"),
                title: args.req_str("title")?,
                description: args.opt_str("description"),
                issue_type: args.opt_enum("type")?,
                status: args.opt_enum("status")?,
                priority: args.opt_enum("priority")?,
                tags: args.string_set("tags")?,
                category: args.string_set("category")?,
                due_date: args.opt_date("due_date")?,
            }),
            "update_issue" => {
                let issue = args.req_str("issue")?;
                let update = args.issue_update(true)?;
                if update.is_empty() {
                    return Err(args.error("no fields to update"));
                }
                SkillCall::UpdateIssue { issue, update }
            }
            "bulk_update_issues" => {
                let issues = args.string_set("issues")?;
                if issues.is_empty() {
                    return Err(args.missing("issues"));
                }
                let update = args.issue_update(false)?;
                if update.is_empty() {
                    return Err(args.error("no fields to update"));
                }
                SkillCall::BulkUpdateIssues { issues, update }
            }
            "add_comment" => SkillCall::AddComment {
                issue: args.req_str("issue")?,
                body: args.req_str("body")?,
            },
            "create_milestone" => SkillCall::CreateMilestone(CreateMilestoneArgs {
                project: args.opt_str("project"),
                name: args.req_str("name")?,
                description: args.opt_str("description"),
                target_date: args.opt_date("target_date")?,
            }),
            "update_milestone" => {
                let milestone_id = args.req_str("milestone_id")?;
                let update = MilestoneUpdate {
                    name: args.opt_str("name"),
                    description: args.opt_str("description"),
                    target_date: args.opt_date("target_date")?,
                    status: args.opt_str("status"),
                    order: args.opt_i64("order")?.map(|o| o as i32),
                };
                if update.is_empty() {
                    return Err(args.error("no fields to update"));
                }
                SkillCall::UpdateMilestone {
                    milestone_id,
                    update,
                }
            }
            "delete_milestone" => SkillCall::DeleteMilestone {
                milestone_id: args.req_str("milestone_id")?,
            },
            "plan_milestones" => SkillCall::PlanMilestones(PlanArgs {
                project: args.opt_str("project"),
                team_size: args.opt_i64("team_size")?.map_or(1, |n| n.max(1) as usize),
                target_date: args.opt_date("target_date")?,
            }),
            "adjust_milestone_plan" => {
                let milestone = args.req_str("milestone")?;
                let action = args.req_str("action")?;
                let adjustment = match action.to_lowercase().as_str() {
                    "move_issue" | "move" => PlanAdjustment::MoveIssue {
                        milestone,
                        issue: args.req_str("issue")?,
                    },
                    "rename" => PlanAdjustment::Rename {
                        milestone,
                        name: args.req_str("name")?,
                    },
                    "retarget" => PlanAdjustment::Retarget {
                        milestone,
                        target_date: args
                            .opt_date("target_date")?
                            .ok_or_else(|| args.missing("target_date"))?,
                    },
                    other => return Err(args.error(format!("unknown action '{}'", other))),
                };
                SkillCall::AdjustMilestonePlan(adjustment)
            }
            "apply_milestone_plan" => {
                let milestones = match args.get("milestones") {
                    Some(Value::Array(items)) if !items.is_empty() => Some(
                        items
                            .iter()
                            .map(|item| {
                                serde_json::from_value::<PlannedMilestoneInput>(item.clone())
                                    .map_err(|e| args.error(format!("invalid milestone: {}", e)))
                            })
                            .collect::<AppResult<Vec<_>>>()?,
                    ),
                    Some(Value::Array(_)) | None => None,
                    Some(_) => return Err(args.error("'milestones' must be an array")),
                };
                SkillCall::ApplyMilestonePlan(ApplyPlanArgs {
                    project: args.opt_str("project"),
                    milestones,
                })
            }
            other => {
                return Err(AppError::skill_validation(other, "unknown skill"));
            }
        };
        Ok(call)
    }

    pub fn skill_name(&self) -> &'static str {
        match self {
            SkillCall::SearchIssues(_) => "search_issues",
            SkillCall::ListProjects => "list_projects",
            SkillCall::ListMilestones { .. } => "list_milestones",
            SkillCall::GetProjectMetrics { .. } => "get_project_metrics",
            SkillCall::SuggestPriorities { .. } => "suggest_priorities",
            SkillCall::FindSimilarIssues(_) => "find_similar_issues",
            SkillCall::CreateIssue(_) => "create_issue",
            SkillCall::UpdateIssue { .. } => "update_issue",
            SkillCall::BulkUpdateIssues { .. } => "bulk_update_issues",
            SkillCall::AddComment { .. } => "add_comment",
            SkillCall::CreateMilestone(_) => "create_milestone",
            SkillCall::UpdateMilestone { .. } => "update_milestone",
            SkillCall::DeleteMilestone { .. } => "delete_milestone",
            SkillCall::PlanMilestones(_) => "plan_milestones",
            SkillCall::AdjustMilestonePlan(_) => "adjust_milestone_plan",
            SkillCall::ApplyMilestonePlan(_) => "apply_milestone_plan",
        }
    }
}

/// Coerce an array or comma-separated string into a trimmed, de-duplicated
/// list. Non-string array items are stringified.
pub fn coerce_string_set(value: &Value) -> Option<Vec<String>> {
    let raw: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                Value::String(s) => s.split(',').map(str::to_string).collect::<Vec<_>>(),
                Value::Null => Vec::new(),
                other => vec![other.to_string()],
            })
            .collect(),
        Value::Number(n) => vec![n.to_string()],
        _ => return None,
    };
    let mut out: Vec<String> = Vec::new();
    for item in raw {
        let item = item.trim().to_string();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    Some(out)
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Borrowed view over an argument object with typed accessors.
struct Args<'a> {
    skill: &'a str,
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    fn new(skill: &'a str, value: &'a Value) -> AppResult<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                skill,
                map: Some(map),
            }),
            Value::Null => Ok(Self { skill, map: None }),
            _ => Err(AppError::skill_validation(skill, "arguments must be an object")),
        }
    }

    fn error(&self, message: impl Into<String>) -> AppError {
        AppError::skill_validation(self.skill, message)
    }

    fn missing(&self, field: &str) -> AppError {
        self.error(format!("missing required field '{}'", field))
    }

    /// Present and not null.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map
            .and_then(|m| m.get(key))
            .filter(|v| !v.is_null())
    }

    fn opt_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn req_str(&self, key: &str) -> AppResult<String> {
        self.opt_str(key).ok_or_else(|| self.missing(key))
    }

    fn string_set(&self, key: &str) -> AppResult<Vec<String>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(value) => coerce_string_set(value)
                .ok_or_else(|| self.error(format!("'{}' must be a list or comma-separated string", key))),
        }
    }

    fn opt_enum<T: FromStr>(&self, key: &str) -> AppResult<Option<T>> {
        match self.opt_str(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| self.error(format!("invalid value '{}' for '{}'", raw, key))),
        }
    }

    fn enum_list<T: FromStr + PartialEq>(&self, key: &str) -> AppResult<Vec<T>> {
        let mut out = Vec::new();
        for raw in self.string_set(key)? {
            let value = raw
                .parse::<T>()
                .map_err(|_| self.error(format!("invalid value '{}' for '{}'", raw, key)))?;
            if !out.contains(&value) {
                out.push(value);
            }
        }
        Ok(out)
    }

    fn opt_date(&self, key: &str) -> AppResult<Option<NaiveDate>> {
        match self.opt_str(key) {
            None => Ok(None),
            Some(raw) => parse_date(&raw)
                .map(Some)
                .ok_or_else(|| self.error(format!("'{}' must be a YYYY-MM-DD date, got '{}'", key, raw))),
        }
    }

    fn opt_i64(&self, key: &str) -> AppResult<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Some)
                .ok_or_else(|| self.error(format!("'{}' must be an integer", key))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| self.error(format!("'{}' must be an integer", key))),
            Some(_) => Err(self.error(format!("'{}' must be an integer", key))),
        }
    }

    fn limit(&self, key: &str, default: usize) -> AppResult<usize> {
        Ok(self
            .opt_i64(key)?
            .map_or(default, |n| n.clamp(1, MAX_LIMIT as i64) as usize))
    }

    /// Shared field set of update_issue and bulk_update_issues.
    fn issue_update(&self, allow_text: bool) -> AppResult<IssueUpdate> {
        let milestone_id = match self.get("milestone_id") {
            None => None,
            Some(Value::String(s)) if s.trim().is_empty() => Some(None),
            Some(_) => self.opt_str("milestone_id").map(Some),
        };
        let tags = match self.get("tags") {
            None => None,
            Some(_) => Some(self.string_set("tags")?),
        };
        let category = match self.get("category") {
            None => None,
            Some(_) => Some(self.string_set("category")?),
        };
        Ok(IssueUpdate {
            title: if allow_text { self.opt_str("title") } else { None },
            description: if allow_text {
                self.opt_str("description")
            } else {
                None
            },
            issue_type: self.opt_enum("type")?,
            status: self.opt_enum("status")?,
            priority: self.opt_enum("priority")?,
            tags,
            category,
            milestone_id,
            due_date: self.opt_date("due_date")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validation_message(err: AppError) -> String {
        match err {
            AppError::SkillValidation { message, .. } => message,
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_string_set_coercion() {
        assert_eq!(
            coerce_string_set(&json!("FRONT, BACK,FRONT")).unwrap(),
            vec!["FRONT", "BACK"]
        );
        assert_eq!(
            coerce_string_set(&json!(["ui", "api,db", 7])).unwrap(),
            vec!["ui", "api", "db", "7"]
        );
        assert!(coerce_string_set(&json!({"a": 1})).is_none());
    }

    #[test]
    fn test_search_arguments() {
        let call = SkillCall::parse(
            "search_issues",
            &json!({"status": "todo,in progress", "priority": ["high"], "limit": 500}),
        )
        .unwrap();
        match call {
            SkillCall::SearchIssues(args) => {
                assert_eq!(args.status, vec![IssueStatus::Todo, IssueStatus::InProgress]);
                assert_eq!(args.priority, vec![Priority::High]);
                assert_eq!(args.limit, MAX_LIMIT);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_field_is_named() {
        let err = SkillCall::parse("create_issue", &json!({"description": "x"})).unwrap_err();
        assert_eq!(validation_message(err), "missing required field 'title'");

        let err = SkillCall::parse("add_comment", &json!({"issue": "APP-1"})).unwrap_err();
        assert!(validation_message(err).contains("'body'"));
    }

    #[test]
    fn test_invalid_enum_and_date() {
        let err = SkillCall::parse("create_issue", &json!({"title": "A", "priority": "asap"}))
            .unwrap_err();
        assert!(validation_message(err).contains("asap"));

        let err = SkillCall::parse("create_milestone", &json!({"name": "v1", "target_date": "next friday"}))
            .unwrap_err();
        assert!(validation_message(err).contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_update_issue_fields() {
        let call = SkillCall::parse(
            "update_issue",
            &json!({"issue": "APP-3", "status": "done", "milestone_id": "", "tags": "a,b"}),
        )
        .unwrap();
        match call {
            SkillCall::UpdateIssue { issue, update } => {
                assert_eq!(issue, "APP-3");
                assert_eq!(update.status, Some(IssueStatus::Done));
                assert_eq!(update.milestone_id, Some(None));
                assert_eq!(update.tags, Some(vec!["a".to_string(), "b".to_string()]));
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = SkillCall::parse("update_issue", &json!({"issue": "APP-3"})).unwrap_err();
        assert_eq!(validation_message(err), "no fields to update");
    }

    #[test]
    fn test_bulk_update_accepts_comma_list() {
        let call = SkillCall::parse(
            "bulk_update_issues",
            &json!({"issues": "APP-1, APP-2", "priority": "low"}),
        )
        .unwrap();
        assert_eq!(call.skill_name(), "bulk_update_issues");
        match call {
            SkillCall::BulkUpdateIssues { issues, .. } => assert_eq!(issues, vec!["APP-1", "APP-2"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_plan_arguments() {
        let call = SkillCall::parse(
            "plan_milestones",
            &json!({"project": "APP", "team_size": "3", "target_date": "2026-09-01"}),
        )
        .unwrap();
        assert_eq!(
            call,
            SkillCall::PlanMilestones(PlanArgs {
                project: Some("APP".to_string()),
                team_size: 3,
                target_date: NaiveDate::from_ymd_opt(2026, 9, 1),
            })
        );

        let call = SkillCall::parse("plan_milestones", &Value::Null).unwrap();
        assert_eq!(
            call,
            SkillCall::PlanMilestones(PlanArgs {
                project: None,
                team_size: 1,
                target_date: None,
            })
        );
    }

    #[test]
    fn test_adjust_plan_actions() {
        let call = SkillCall::parse(
            "adjust_milestone_plan",
            &json!({"action": "move_issue", "milestone": "2", "issue": "APP-4"}),
        )
        .unwrap();
        assert_eq!(
            call,
            SkillCall::AdjustMilestonePlan(PlanAdjustment::MoveIssue {
                milestone: "2".to_string(),
                issue: "APP-4".to_string(),
            })
        );

        let err = SkillCall::parse(
            "adjust_milestone_plan",
            &json!({"action": "retarget", "milestone": "Backlog"}),
        )
        .unwrap_err();
        assert!(validation_message(err).contains("target_date"));
    }

    #[test]
    fn test_apply_plan_with_and_without_payload() {
        let call = SkillCall::parse("apply_milestone_plan", &json!({})).unwrap();
        assert_eq!(
            call,
            SkillCall::ApplyMilestonePlan(ApplyPlanArgs {
                project: None,
                milestones: None,
            })
        );

        let call = SkillCall::parse(
            "apply_milestone_plan",
            &json!({"project": "p-1", "milestones": [{"name": "M1", "issue_ids": ["i-1"]}]}),
        )
        .unwrap();
        match call {
            SkillCall::ApplyMilestonePlan(args) => {
                let milestones = args.milestones.unwrap();
                assert_eq!(milestones[0].name, "M1");
                assert_eq!(milestones[0].issue_ids, vec!["i-1"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_skill_and_bad_shape() {
        assert!(SkillCall::parse("drop_tables", &json!({})).is_err());
        assert!(SkillCall::parse("search_issues", &json!("text")).is_err());
        assert!(SkillCall::parse("find_similar_issues", &json!({})).is_err());
    }
}
