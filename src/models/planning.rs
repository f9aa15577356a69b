//! Planning Models
//!
//! Output shapes of the analyzer and the milestone planner. All of these are
//! derived per call and never persisted.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A heuristic edge between two open issues. For explicit mentions `from`
/// mentions `to`; for similarity edges `from` is the more foundational issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedDependency {
    pub from_issue_id: String,
    pub to_issue_id: String,
    pub reason: String,
    /// In [0, 1].
    pub confidence: f64,
}

/// Throughput derived from done issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityStats {
    /// Done issues updated in the last 28 days, per week.
    pub issues_per_week_4w: f64,
    /// Done issues updated in the last 56 days, per week.
    pub issues_per_week_8w: f64,
    /// Mean days from creation to last update over done issues; `None`
    /// without valid samples.
    pub avg_days_to_close: Option<f64>,
    /// Number of valid close-time samples.
    pub sample_size: usize,
}

/// One milestone in a proposed plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedMilestone {
    pub name: String,
    pub description: String,
    pub target_date: NaiveDate,
    /// 1-based position in the plan.
    pub order: i32,
    pub issue_ids: Vec<String>,
    /// "APP-3: Title" lines, same order as `issue_ids`.
    pub issues_summary: Vec<String>,
}

/// A full planner result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestonePlan {
    pub project_id: String,
    pub proposed_milestones: Vec<ProposedMilestone>,
    pub dependencies: Vec<DetectedDependency>,
    pub velocity: VelocityStats,
    /// Target date of the last milestone; `None` for an empty plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_end: Option<NaiveDate>,
    /// Days the schedule runs past the requested target date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrun_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl MilestonePlan {
    /// Every issue id in plan order.
    pub fn issue_ids(&self) -> impl Iterator<Item = &String> {
        self.proposed_milestones
            .iter()
            .flat_map(|m| m.issue_ids.iter())
    }
}

/// Per-project breakdowns used by the analysis skills and the no-model
/// fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub project_id: String,
    pub total: usize,
    pub open: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub velocity: VelocityStats,
}

/// A ranked open issue with the reasons behind its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritySuggestion {
    pub issue_id: String,
    pub display_id: String,
    pub title: String,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// An issue that looks like another one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarIssue {
    pub issue_id: String,
    pub display_id: String,
    pub title: String,
    pub similarity: f64,
}
