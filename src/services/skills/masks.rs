//! Tool Masks
//!
//! Fixed skill subsets shown to the model. The conversation phase picks the
//! mask unless the caller pins one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::conversation::ConversationState;
use crate::utils::error::AppError;

const DEFAULT: &[&str] = &[
    "search_issues",
    "list_projects",
    "list_milestones",
    "get_project_metrics",
    "suggest_priorities",
    "find_similar_issues",
    "create_issue",
    "update_issue",
    "bulk_update_issues",
    "add_comment",
    "create_milestone",
    "update_milestone",
    "delete_milestone",
    "plan_milestones",
];

const MILESTONE_PLANNING: &[&str] = &[
    "plan_milestones",
    "search_issues",
    "list_projects",
    "list_milestones",
    "get_project_metrics",
    "find_similar_issues",
];

const MILESTONE_CONFIRM: &[&str] = &[
    "apply_milestone_plan",
    "adjust_milestone_plan",
    "plan_milestones",
];

const READ_ONLY: &[&str] = &[
    "search_issues",
    "list_projects",
    "list_milestones",
    "get_project_metrics",
    "suggest_priorities",
    "find_similar_issues",
];

const CREATION: &[&str] = &[
    "create_issue",
    "add_comment",
    "search_issues",
    "list_projects",
    "create_milestone",
];

/// A named skill subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMask {
    Default,
    MilestonePlanning,
    MilestoneConfirm,
    ReadOnly,
    Creation,
}

impl ToolMask {
    pub const ALL: [ToolMask; 5] = [
        ToolMask::Default,
        ToolMask::MilestonePlanning,
        ToolMask::MilestoneConfirm,
        ToolMask::ReadOnly,
        ToolMask::Creation,
    ];

    pub fn skills(&self) -> &'static [&'static str] {
        match self {
            ToolMask::Default => DEFAULT,
            ToolMask::MilestonePlanning => MILESTONE_PLANNING,
            ToolMask::MilestoneConfirm => MILESTONE_CONFIRM,
            ToolMask::ReadOnly => READ_ONLY,
            ToolMask::Creation => CREATION,
        }
    }

    pub fn allows(&self, skill: &str) -> bool {
        self.skills().contains(&skill)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolMask::Default => "default",
            ToolMask::MilestonePlanning => "milestone_planning",
            ToolMask::MilestoneConfirm => "milestone_confirm",
            ToolMask::ReadOnly => "read_only",
            ToolMask::Creation => "creation",
        }
    }
}

impl fmt::Display for ToolMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolMask {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolMask::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::validation(format!("Unknown tool mask: {}", s)))
    }
}

/// Mask for a conversation phase.
pub fn select_mask(state: ConversationState) -> ToolMask {
    match state {
        ConversationState::PlanProposed => ToolMask::MilestoneConfirm,
        ConversationState::Planning => ToolMask::MilestonePlanning,
        ConversationState::Reporting => ToolMask::ReadOnly,
        _ => ToolMask::Default,
    }
}
