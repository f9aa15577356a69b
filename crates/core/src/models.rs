//! Domain Snapshot Models
//!
//! Read-only snapshots of the tracker's entities. The tracker backend owns
//! these records; the assistant receives snapshots from its caller and only
//! writes back through the `DomainGateway`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Enumerations
// ============================================================================

/// Workflow status of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Backlog,
    Todo,
    InProgress,
    InReview,
    Done,
    Cancelled,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 6] = [
        IssueStatus::Backlog,
        IssueStatus::Todo,
        IssueStatus::InProgress,
        IssueStatus::InReview,
        IssueStatus::Done,
        IssueStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Backlog => "backlog",
            IssueStatus::Todo => "todo",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::InReview => "in_review",
            IssueStatus::Done => "done",
            IssueStatus::Cancelled => "cancelled",
        }
    }

    /// Open issues are everything that is neither done nor cancelled.
    pub fn is_open(&self) -> bool {
        !matches!(self, IssueStatus::Done | IssueStatus::Cancelled)
    }
}

impl Default for IssueStatus {
    fn default() -> Self {
        Self::Backlog
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "backlog" => Ok(IssueStatus::Backlog),
            "todo" | "to_do" => Ok(IssueStatus::Todo),
            "in_progress" | "doing" => Ok(IssueStatus::InProgress),
            "in_review" | "review" => Ok(IssueStatus::InReview),
            "done" | "closed" => Ok(IssueStatus::Done),
            "cancelled" | "canceled" => Ok(IssueStatus::Cancelled),
            _ => Err(CoreError::parse(format!("unknown status '{}'", s))),
        }
    }
}

/// Issue priority, ordered urgent > high > medium > low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Urgent, Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Higher is more important. Issues without a priority rank below `Low`.
    pub fn rank(priority: Option<Priority>) -> u8 {
        match priority {
            Some(Priority::Urgent) => 4,
            Some(Priority::High) => 3,
            Some(Priority::Medium) => 2,
            Some(Priority::Low) => 1,
            None => 0,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "urgent" | "critical" => Ok(Priority::Urgent),
            "high" => Ok(Priority::High),
            "medium" | "normal" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(CoreError::parse(format!("unknown priority '{}'", s))),
        }
    }
}

/// Kind of work an issue represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Feature,
    Improvement,
    Bug,
    Question,
}

impl IssueType {
    pub const ALL: [IssueType; 4] = [
        IssueType::Feature,
        IssueType::Improvement,
        IssueType::Bug,
        IssueType::Question,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Feature => "feature",
            IssueType::Improvement => "improvement",
            IssueType::Bug => "bug",
            IssueType::Question => "question",
        }
    }

    /// How foundational this kind of work is: feature > improvement > bug > question.
    pub fn rank(&self) -> u8 {
        match self {
            IssueType::Feature => 4,
            IssueType::Improvement => 3,
            IssueType::Bug => 2,
            IssueType::Question => 1,
        }
    }
}

impl Default for IssueType {
    fn default() -> Self {
        Self::Feature
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feature" => Ok(IssueType::Feature),
            "improvement" | "enhancement" => Ok(IssueType::Improvement),
            "bug" => Ok(IssueType::Bug),
            "question" => Ok(IssueType::Question),
            _ => Err(CoreError::parse(format!("unknown issue type '{}'", s))),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// A project in the tracker. `prefix` is the short display-id prefix ("APP").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An issue snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    /// Human-facing identifier, e.g. "APP-12".
    pub display_id: String,
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
    #[serde(default)]
    pub assignee_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Title and description joined, used for mention and similarity scans.
    pub fn text(&self) -> String {
        match &self.description {
            Some(desc) if !desc.is_empty() => format!("{}\n{}", self.title, desc),
            _ => self.title.clone(),
        }
    }

    /// "APP-12: Fix login redirect"
    pub fn headline(&self) -> String {
        format!("{}: {}", self.display_id, self.title)
    }
}

/// A milestone (release bucket) within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default = "default_milestone_status")]
    pub status: String,
    #[serde(default)]
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

fn default_milestone_status() -> String {
    "active".to_string()
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub issue_id: String,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_aliases() {
        assert_eq!("In Progress".parse::<IssueStatus>().unwrap(), IssueStatus::InProgress);
        assert_eq!("in-review".parse::<IssueStatus>().unwrap(), IssueStatus::InReview);
        assert_eq!("canceled".parse::<IssueStatus>().unwrap(), IssueStatus::Cancelled);
        assert!("shipping".parse::<IssueStatus>().is_err());
    }

    #[test]
    fn test_status_open() {
        assert!(IssueStatus::Todo.is_open());
        assert!(IssueStatus::InReview.is_open());
        assert!(!IssueStatus::Done.is_open());
        assert!(!IssueStatus::Cancelled.is_open());
    }

    #[test]
    fn test_priority_rank_ordering() {
        assert!(Priority::rank(Some(Priority::Urgent)) > Priority::rank(Some(Priority::High)));
        assert!(Priority::rank(Some(Priority::High)) > Priority::rank(Some(Priority::Medium)));
        assert!(Priority::rank(Some(Priority::Medium)) > Priority::rank(Some(Priority::Low)));
        assert!(Priority::rank(Some(Priority::Low)) > Priority::rank(None));
    }

    #[test]
    fn test_type_rank_ordering() {
        assert!(IssueType::Feature.rank() > IssueType::Improvement.rank());
        assert!(IssueType::Improvement.rank() > IssueType::Bug.rank());
        assert!(IssueType::Bug.rank() > IssueType::Question.rank());
    }

    #[test]
    fn test_issue_deserialization_defaults() {
        let json = r#"{
            "id": "i-1",
            "project_id": "p-1",
            "display_id": "APP-1",
            "title": "Login broken",
            "type": "bug",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-02T00:00:00Z"
        }"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.issue_type, IssueType::Bug);
        assert_eq!(issue.status, IssueStatus::Backlog);
        assert!(issue.priority.is_none());
        assert!(issue.category.is_empty());
        assert_eq!(issue.headline(), "APP-1: Login broken");
    }

    #[test]
    fn test_issue_text_includes_description() {
        let json = r#"{
            "id": "i-1", "project_id": "p-1", "display_id": "APP-1",
            "title": "Title", "description": "Body",
            "created_at": "2026-01-01T00:00:00Z", "updated_at": "2026-01-01T00:00:00Z"
        }"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.text(), "Title\nBody");
    }

    #[test]
    fn test_milestone_status_default() {
        let json = r#"{
            "id": "m-1", "project_id": "p-1", "name": "Beta",
            "created_at": "2026-01-01T00:00:00Z"
        }"#;
        let milestone: Milestone = serde_json::from_str(json).unwrap();
        assert_eq!(milestone.status, "active");
        assert_eq!(milestone.order, 0);
    }
}
