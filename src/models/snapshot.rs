//! Domain Snapshot
//!
//! The caller's view of the tracker at the start of a turn. Skills read from
//! it; writes go through the gateway.

use serde::{Deserialize, Serialize};
use tracker_assistant_core::{Issue, Milestone, Project};

/// Projects, issues and milestones known to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainSnapshot {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl DomainSnapshot {
    pub fn issues_for_project<'a>(&'a self, project_id: &'a str) -> impl Iterator<Item = &'a Issue> {
        self.issues.iter().filter(move |i| i.project_id == project_id)
    }

    /// Look up an issue by internal id or display id (case-insensitive).
    pub fn find_issue(&self, reference: &str) -> Option<&Issue> {
        let reference = reference.trim();
        self.issues
            .iter()
            .find(|i| i.id == reference)
            .or_else(|| {
                self.issues
                    .iter()
                    .find(|i| i.display_id.eq_ignore_ascii_case(reference))
            })
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty() && self.issues.is_empty() && self.milestones.is_empty()
    }
}
