//! Domain Gateway Contract
//!
//! The tracker backend owns issues, projects, comments and milestones. The
//! assistant reaches it only through this trait; implementations may be an
//! HTTP client, a database adapter, or the in-memory gateway used by tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::models::{Comment, Issue, IssueStatus, IssueType, Milestone, Priority, Project};

/// Filter for issue searches. Empty fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Case-insensitive substring over title, description and display id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<IssueStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub priority: Vec<Priority>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl IssueFilter {
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Default::default()
        }
    }

    /// Whether an issue passes every populated constraint.
    pub fn matches(&self, issue: &Issue) -> bool {
        if let Some(project_id) = &self.project_id {
            if &issue.project_id != project_id {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let haystack = format!("{}\n{}", issue.display_id, issue.text()).to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        if !self.status.is_empty() && !self.status.contains(&issue.status) {
            return false;
        }
        if !self.priority.is_empty() {
            match issue.priority {
                Some(p) if self.priority.contains(&p) => {}
                _ => return false,
            }
        }
        if !self.category.is_empty() {
            let wanted = self.category.iter().any(|c| {
                issue
                    .category
                    .iter()
                    .any(|ic| ic.eq_ignore_ascii_case(c))
            });
            if !wanted {
                return false;
            }
        }
        true
    }
}

/// Fields for a new issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIssue {
    pub project_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub issue_type: IssueType,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// Partial update for an issue. `None` leaves a field untouched.
///
/// `milestone_id` is doubly optional: `Some(None)` detaches the issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self == &IssueUpdate::default()
    }

    /// Apply the populated fields to an issue snapshot.
    pub fn apply_to(&self, issue: &mut Issue) {
        if let Some(title) = &self.title {
            issue.title = title.clone();
        }
        if let Some(description) = &self.description {
            issue.description = Some(description.clone());
        }
        if let Some(issue_type) = self.issue_type {
            issue.issue_type = issue_type;
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
        if let Some(priority) = self.priority {
            issue.priority = Some(priority);
        }
        if let Some(tags) = &self.tags {
            issue.tags = tags.clone();
        }
        if let Some(category) = &self.category {
            issue.category = category.clone();
        }
        if let Some(milestone_id) = &self.milestone_id {
            issue.milestone_id = milestone_id.clone();
        }
        if let Some(due_date) = self.due_date {
            issue.due_date = Some(due_date);
        }
    }
}

/// Fields for a new milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMilestone {
    pub project_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

/// Partial update for a milestone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MilestoneUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl MilestoneUpdate {
    pub fn is_empty(&self) -> bool {
        self == &MilestoneUpdate::default()
    }
}

/// CRUD surface of the tracker backend.
///
/// Every method reports failures as `CoreError`; callers sanitize the message
/// before it reaches the model or the user.
#[async_trait]
pub trait DomainGateway: Send + Sync {
    async fn search_issues(&self, filter: &IssueFilter) -> CoreResult<Vec<Issue>>;

    async fn list_issues_by_project(&self, project_id: &str) -> CoreResult<Vec<Issue>>;

    async fn create_issue(&self, issue: NewIssue) -> CoreResult<Issue>;

    async fn update_issue(&self, issue_id: &str, update: IssueUpdate) -> CoreResult<Issue>;

    /// Apply one update to several issues. Implementations may stop at the
    /// first failure; the dispatcher reports per-item outcomes itself.
    async fn bulk_update_issues(
        &self,
        issue_ids: &[String],
        update: IssueUpdate,
    ) -> CoreResult<Vec<Issue>>;

    async fn add_comment(&self, issue_id: &str, body: &str) -> CoreResult<Comment>;

    async fn list_projects(&self) -> CoreResult<Vec<Project>>;

    async fn list_milestones_by_project(&self, project_id: &str) -> CoreResult<Vec<Milestone>>;

    async fn create_milestone(&self, milestone: NewMilestone) -> CoreResult<Milestone>;

    async fn update_milestone(
        &self,
        milestone_id: &str,
        update: MilestoneUpdate,
    ) -> CoreResult<Milestone>;

    async fn delete_milestone(&self, milestone_id: &str) -> CoreResult<()>;
}
