//! In-Memory Gateway
//!
//! A `DomainGateway` over plain vectors behind a tokio `RwLock`. Backs the
//! command-line binary and the tests; nothing is persisted.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use tracker_assistant_core::{
    Comment, CoreError, CoreResult, DomainGateway, Issue, IssueFilter, IssueUpdate, Milestone,
    MilestoneUpdate, NewIssue, NewMilestone, Project,
};
use uuid::Uuid;

use crate::models::snapshot::DomainSnapshot;

const COMMENT_AUTHOR: &str = "assistant";

#[derive(Debug, Default)]
struct Store {
    projects: Vec<Project>,
    issues: Vec<Issue>,
    milestones: Vec<Milestone>,
    comments: Vec<Comment>,
}

impl Store {
    fn project(&self, project_id: &str) -> CoreResult<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == project_id)
            .ok_or_else(|| CoreError::not_found(format!("project {}", project_id)))
    }

    fn issue_index(&self, issue_id: &str) -> CoreResult<usize> {
        self.issues
            .iter()
            .position(|i| i.id == issue_id)
            .ok_or_else(|| CoreError::not_found(format!("issue {}", issue_id)))
    }

    fn milestone_index(&self, milestone_id: &str) -> CoreResult<usize> {
        self.milestones
            .iter()
            .position(|m| m.id == milestone_id)
            .ok_or_else(|| CoreError::not_found(format!("milestone {}", milestone_id)))
    }

    /// Next `PREFIX-n` for a project.
    fn next_display_id(&self, project: &Project) -> String {
        let marker = format!("{}-", project.prefix);
        let highest = self
            .issues
            .iter()
            .filter(|i| i.project_id == project.id)
            .filter_map(|i| i.display_id.strip_prefix(&marker)?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("{}{}", marker, highest + 1)
    }

    /// A milestone assignment must point at a milestone of the issue's project.
    fn check_assignment(&self, issue: &Issue, update: &IssueUpdate) -> CoreResult<()> {
        if let Some(Some(milestone_id)) = &update.milestone_id {
            let milestone = &self.milestones[self.milestone_index(milestone_id)?];
            if milestone.project_id != issue.project_id {
                return Err(CoreError::validation(format!(
                    "milestone {} belongs to another project",
                    milestone_id
                )));
            }
        }
        Ok(())
    }
}

/// In-memory tracker backend
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    store: RwLock<Store>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: DomainSnapshot) -> Self {
        Self {
            store: RwLock::new(Store {
                projects: snapshot.projects,
                issues: snapshot.issues,
                milestones: snapshot.milestones,
                comments: Vec::new(),
            }),
        }
    }

    /// Current contents as a snapshot for the next turn.
    pub async fn snapshot(&self) -> DomainSnapshot {
        let store = self.store.read().await;
        DomainSnapshot {
            projects: store.projects.clone(),
            issues: store.issues.clone(),
            milestones: store.milestones.clone(),
        }
    }

    pub async fn comments_for(&self, issue_id: &str) -> Vec<Comment> {
        let store = self.store.read().await;
        store
            .comments
            .iter()
            .filter(|c| c.issue_id == issue_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DomainGateway for InMemoryGateway {
    async fn search_issues(&self, filter: &IssueFilter) -> CoreResult<Vec<Issue>> {
        let store = self.store.read().await;
        let mut found: Vec<Issue> = store
            .issues
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn list_issues_by_project(&self, project_id: &str) -> CoreResult<Vec<Issue>> {
        let store = self.store.read().await;
        store.project(project_id)?;
        Ok(store
            .issues
            .iter()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_issue(&self, issue: NewIssue) -> CoreResult<Issue> {
        if issue.title.trim().is_empty() {
            return Err(CoreError::validation("issue title must not be empty"));
        }
        let mut store = self.store.write().await;
        let project = store.project(&issue.project_id)?.clone();
        if let Some(milestone_id) = &issue.milestone_id {
            store.milestone_index(milestone_id)?;
        }

        let now = Utc::now();
        let created = Issue {
            id: Uuid::new_v4().to_string(),
            display_id: store.next_display_id(&project),
            project_id: project.id,
            milestone_id: issue.milestone_id,
            title: issue.title.trim().to_string(),
            description: issue.description,
            issue_type: issue.issue_type,
            status: issue.status,
            priority: issue.priority,
            tags: issue.tags,
            category: issue.category,
            assignee_ids: Vec::new(),
            due_date: issue.due_date,
            estimate: None,
            created_at: now,
            updated_at: now,
        };
        debug!(display_id = %created.display_id, "Issue created");
        store.issues.push(created.clone());
        Ok(created)
    }

    async fn update_issue(&self, issue_id: &str, update: IssueUpdate) -> CoreResult<Issue> {
        if update.is_empty() {
            return Err(CoreError::validation("no fields to update"));
        }
        let mut store = self.store.write().await;
        let index = store.issue_index(issue_id)?;
        store.check_assignment(&store.issues[index], &update)?;

        let issue = &mut store.issues[index];
        update.apply_to(issue);
        issue.updated_at = Utc::now();
        Ok(issue.clone())
    }

    async fn bulk_update_issues(
        &self,
        issue_ids: &[String],
        update: IssueUpdate,
    ) -> CoreResult<Vec<Issue>> {
        if update.is_empty() {
            return Err(CoreError::validation("no fields to update"));
        }
        let mut store = self.store.write().await;
        let mut indices = Vec::with_capacity(issue_ids.len());
        for issue_id in issue_ids {
            let index = store.issue_index(issue_id)?;
            store.check_assignment(&store.issues[index], &update)?;
            indices.push(index);
        }

        let now = Utc::now();
        let mut updated = Vec::with_capacity(indices.len());
        for index in indices {
            let issue = &mut store.issues[index];
            update.apply_to(issue);
            issue.updated_at = now;
            updated.push(issue.clone());
        }
        Ok(updated)
    }

    async fn add_comment(&self, issue_id: &str, body: &str) -> CoreResult<Comment> {
        if body.trim().is_empty() {
            return Err(CoreError::validation("comment body must not be empty"));
        }
        let mut store = self.store.write().await;
        store.issue_index(issue_id)?;
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            issue_id: issue_id.to_string(),
            author_name: COMMENT_AUTHOR.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        store.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_projects(&self) -> CoreResult<Vec<Project>> {
        Ok(self.store.read().await.projects.clone())
    }

    async fn list_milestones_by_project(&self, project_id: &str) -> CoreResult<Vec<Milestone>> {
        let store = self.store.read().await;
        store.project(project_id)?;
        let mut milestones: Vec<Milestone> = store
            .milestones
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect();
        milestones.sort_by_key(|m| m.order);
        Ok(milestones)
    }

    async fn create_milestone(&self, milestone: NewMilestone) -> CoreResult<Milestone> {
        if milestone.name.trim().is_empty() {
            return Err(CoreError::validation("milestone name must not be empty"));
        }
        let mut store = self.store.write().await;
        store.project(&milestone.project_id)?;
        let order = milestone.order.unwrap_or_else(|| {
            store
                .milestones
                .iter()
                .filter(|m| m.project_id == milestone.project_id)
                .map(|m| m.order)
                .max()
                .unwrap_or(0)
                + 1
        });

        let created = Milestone {
            id: Uuid::new_v4().to_string(),
            project_id: milestone.project_id,
            name: milestone.name.trim().to_string(),
            description: milestone.description,
            target_date: milestone.target_date,
            status: "active".to_string(),
            order,
            created_at: Utc::now(),
        };
        debug!(milestone = %created.name, order, "Milestone created");
        store.milestones.push(created.clone());
        Ok(created)
    }

    async fn update_milestone(
        &self,
        milestone_id: &str,
        update: MilestoneUpdate,
    ) -> CoreResult<Milestone> {
        if update.is_empty() {
            return Err(CoreError::validation("no fields to update"));
        }
        if update.name.as_deref().map_or(false, |n| n.trim().is_empty()) {
            return Err(CoreError::validation("milestone name must not be empty"));
        }
        let mut store = self.store.write().await;
        let index = store.milestone_index(milestone_id)?;
        let milestone = &mut store.milestones[index];
        if let Some(name) = update.name {
            milestone.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            milestone.description = Some(description);
        }
        if let Some(target_date) = update.target_date {
            milestone.target_date = Some(target_date);
        }
        if let Some(status) = update.status {
            milestone.status = status;
        }
        if let Some(order) = update.order {
            milestone.order = order;
        }
        Ok(milestone.clone())
    }

    async fn delete_milestone(&self, milestone_id: &str) -> CoreResult<()> {
        let mut store = self.store.write().await;
        let index = store.milestone_index(milestone_id)?;
        store.milestones.remove(index);
        let now = Utc::now();
        for issue in store
            .issues
            .iter_mut()
            .filter(|i| i.milestone_id.as_deref() == Some(milestone_id))
        {
            issue.milestone_id = None;
            issue.updated_at = now;
        }
        Ok(())
    }
}
