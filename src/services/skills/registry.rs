//! Skill Registry
//!
//! Declares every callable skill: its name, description, argument schema and
//! kind. The kind drives approval gating; the conversation phase a skill
//! moves into lives in the state machine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracker_assistant_core::{IssueStatus, IssueType, Priority};
use tracker_assistant_llm::{ParameterSchema, ToolDefinition};

/// What a skill does to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Read,
    Analysis,
    Mutating,
    Planning,
    /// Mutating, applied as a batch with per-item reporting.
    BatchApply,
}

impl SkillKind {
    /// Skills with side effects on the tracker.
    pub fn is_mutating(&self) -> bool {
        matches!(self, SkillKind::Mutating | SkillKind::BatchApply)
    }
}

/// One registered skill.
#[derive(Debug, Clone)]
pub struct SkillSpec {
    pub kind: SkillKind,
    pub definition: ToolDefinition,
}

impl SkillSpec {
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

/// Registry of the built-in skills, in declaration order
#[derive(Debug, Clone)]
pub struct SkillRegistry {
    skills: HashMap<String, SkillSpec>,
    order: Vec<String>,
}

impl SkillRegistry {
    /// Registry with the full built-in catalogue.
    pub fn builtin() -> Self {
        let mut registry = Self {
            skills: HashMap::new(),
            order: Vec::new(),
        };
        for (kind, definition) in [
            (SkillKind::Read, search_issues()),
            (SkillKind::Read, list_projects()),
            (SkillKind::Read, list_milestones()),
            (SkillKind::Analysis, get_project_metrics()),
            (SkillKind::Analysis, suggest_priorities()),
            (SkillKind::Analysis, find_similar_issues()),
            (SkillKind::Mutating, create_issue()),
            (SkillKind::Mutating, update_issue()),
            (SkillKind::Mutating, bulk_update_issues()),
            (SkillKind::Mutating, add_comment()),
            (SkillKind::Mutating, create_milestone()),
            (SkillKind::Mutating, update_milestone()),
            (SkillKind::Mutating, delete_milestone()),
            (SkillKind::Planning, plan_milestones()),
            (SkillKind::Planning, adjust_milestone_plan()),
            (SkillKind::BatchApply, apply_milestone_plan()),
        ] {
            registry.register(SkillSpec { kind, definition });
        }
        registry
    }

    fn register(&mut self, spec: SkillSpec) {
        let name = spec.name().to_string();
        if self.skills.insert(name.clone(), spec).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&SkillSpec> {
        self.skills.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }

    pub fn kind(&self, name: &str) -> Option<SkillKind> {
        self.skills.get(name).map(|s| s.kind)
    }

    pub fn is_mutating(&self, name: &str) -> bool {
        self.kind(name).map_or(false, |k| k.is_mutating())
    }

    /// Skill names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Tool definitions for the given names, in registry order. Unknown
    /// names are skipped.
    pub fn definitions_for(&self, names: &[&str]) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter(|n| names.contains(&n.as_str()))
            .filter_map(|n| self.skills.get(n))
            .map(|s| s.definition.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Definitions
// ============================================================================

fn status_values() -> Vec<&'static str> {
    IssueStatus::ALL.iter().map(|s| s.as_str()).collect()
}

fn priority_values() -> Vec<&'static str> {
    Priority::ALL.iter().map(|p| p.as_str()).collect()
}

fn type_values() -> Vec<&'static str> {
    IssueType::ALL.iter().map(|t| t.as_str()).collect()
}

fn string_list(description: &str) -> ParameterSchema {
    ParameterSchema::array(Some(description), ParameterSchema::string(None))
}

fn project_param() -> ParameterSchema {
    ParameterSchema::string(Some(
        "Project id, name or short prefix (e.g. APP). Optional when only one project matches.",
    ))
}

fn tool(
    name: &str,
    description: &str,
    properties: HashMap<String, ParameterSchema>,
    required: &[&str],
) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: ParameterSchema::object(
            None,
            properties,
            required.iter().map(|r| r.to_string()).collect(),
        ),
    }
}

fn search_issues() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert("project".to_string(), project_param());
    properties.insert(
        "text".to_string(),
        ParameterSchema::string(Some("Words to look for in title or description")),
    );
    properties.insert(
        "status".to_string(),
        ParameterSchema::array(
            Some("Statuses to include"),
            ParameterSchema::string_enum(None, &status_values()),
        ),
    );
    properties.insert(
        "priority".to_string(),
        ParameterSchema::array(
            Some("Priorities to include"),
            ParameterSchema::string_enum(None, &priority_values()),
        ),
    );
    properties.insert("category".to_string(), string_list("Category keys such as FRONT or BACK"));
    properties.insert(
        "limit".to_string(),
        ParameterSchema::integer(Some("Maximum results (default 20)")),
    );
    tool(
        "search_issues",
        "Search issues by text, status, priority and category.",
        properties,
        &[],
    )
}

fn list_projects() -> ToolDefinition {
    tool("list_projects", "List all projects.", HashMap::new(), &[])
}

fn list_milestones() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert("project".to_string(), project_param());
    tool(
        "list_milestones",
        "List the milestones of a project in order.",
        properties,
        &[],
    )
}

fn get_project_metrics() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert("project".to_string(), project_param());
    tool(
        "get_project_metrics",
        "Issue counts by status, priority and type plus recent velocity for a project.",
        properties,
        &[],
    )
}

fn suggest_priorities() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert("project".to_string(), project_param());
    properties.insert(
        "limit".to_string(),
        ParameterSchema::integer(Some("Maximum suggestions (default 5)")),
    );
    tool(
        "suggest_priorities",
        "Rank open issues by urgency, type, age and how much other work builds on them.",
        properties,
        &[],
    )
}

fn find_similar_issues() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "text".to_string(),
        ParameterSchema::string(Some("Text to compare, e.g. a draft issue title")),
    );
    properties.insert(
        "issue".to_string(),
        ParameterSchema::string(Some("Compare against this issue (id or display id)")),
    );
    properties.insert("project".to_string(), project_param());
    properties.insert(
        "limit".to_string(),
        ParameterSchema::integer(Some("Maximum results (default 5)")),
    );
    tool(
        "find_similar_issues",
        "Find issues with similar wording. Useful to spot duplicates before creating one.",
        properties,
        &[],
    )
}

fn create_issue() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert("project".to_string(), project_param());
    properties.insert("title".to_string(), ParameterSchema::string(Some("Issue title")));
    properties.insert(
        "description".to_string(),
        ParameterSchema::string(Some("Issue description")),
    );
    properties.insert(
        "type".to_string(),
        ParameterSchema::string_enum(Some("Issue type (default feature)"), &type_values()),
    );
    properties.insert(
        "status".to_string(),
        ParameterSchema::string_enum(Some("Initial status (default backlog)"), &status_values()),
    );
    properties.insert(
        "priority".to_string(),
        ParameterSchema::string_enum(Some("Priority"), &priority_values()),
    );
    properties.insert("tags".to_string(), string_list("Free-form tags"));
    properties.insert("category".to_string(), string_list("Category keys"));
    properties.insert(
        "due_date".to_string(),
        ParameterSchema::string(Some("Due date, YYYY-MM-DD")),
    );
    tool("create_issue", "Create a new issue.", properties, &["title"])
}

fn issue_field_properties(properties: &mut HashMap<String, ParameterSchema>) {
    properties.insert(
        "status".to_string(),
        ParameterSchema::string_enum(Some("New status"), &status_values()),
    );
    properties.insert(
        "priority".to_string(),
        ParameterSchema::string_enum(Some("New priority"), &priority_values()),
    );
    properties.insert(
        "type".to_string(),
        ParameterSchema::string_enum(Some("New type"), &type_values()),
    );
    properties.insert("tags".to_string(), string_list("Replacement tag list"));
    properties.insert("category".to_string(), string_list("Replacement category list"));
    properties.insert(
        "milestone_id".to_string(),
        ParameterSchema::string(Some("Milestone to move the issue to; empty string to clear")),
    );
    properties.insert(
        "due_date".to_string(),
        ParameterSchema::string(Some("Due date, YYYY-MM-DD")),
    );
}

fn update_issue() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "issue".to_string(),
        ParameterSchema::string(Some("Issue id or display id such as APP-12")),
    );
    properties.insert("title".to_string(), ParameterSchema::string(Some("New title")));
    properties.insert(
        "description".to_string(),
        ParameterSchema::string(Some("New description")),
    );
    issue_field_properties(&mut properties);
    tool(
        "update_issue",
        "Change fields of one issue. Only the given fields change.",
        properties,
        &["issue"],
    )
}

fn bulk_update_issues() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "issues".to_string(),
        string_list("Issue ids or display ids to update"),
    );
    issue_field_properties(&mut properties);
    tool(
        "bulk_update_issues",
        "Apply the same field changes to several issues.",
        properties,
        &["issues"],
    )
}

fn add_comment() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "issue".to_string(),
        ParameterSchema::string(Some("Issue id or display id")),
    );
    properties.insert("body".to_string(), ParameterSchema::string(Some("Comment text")));
    tool(
        "add_comment",
        "Add a comment to an issue.",
        properties,
        &["issue", "body"],
    )
}

fn create_milestone() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert("project".to_string(), project_param());
    properties.insert("name".to_string(), ParameterSchema::string(Some("Milestone name")));
    properties.insert(
        "description".to_string(),
        ParameterSchema::string(Some("Milestone description")),
    );
    properties.insert(
        "target_date".to_string(),
        ParameterSchema::string(Some("Target date, YYYY-MM-DD")),
    );
    tool(
        "create_milestone",
        "Create a milestone in a project.",
        properties,
        &["name"],
    )
}

fn update_milestone() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "milestone_id".to_string(),
        ParameterSchema::string(Some("Milestone id")),
    );
    properties.insert("name".to_string(), ParameterSchema::string(Some("New name")));
    properties.insert(
        "description".to_string(),
        ParameterSchema::string(Some("New description")),
    );
    properties.insert(
        "target_date".to_string(),
        ParameterSchema::string(Some("New target date, YYYY-MM-DD")),
    );
    properties.insert(
        "status".to_string(),
        ParameterSchema::string_enum(Some("Milestone status"), &["active", "completed", "archived"]),
    );
    tool(
        "update_milestone",
        "Change fields of a milestone.",
        properties,
        &["milestone_id"],
    )
}

fn delete_milestone() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "milestone_id".to_string(),
        ParameterSchema::string(Some("Milestone id")),
    );
    tool(
        "delete_milestone",
        "Delete a milestone. Its issues stay in the project without a milestone.",
        properties,
        &["milestone_id"],
    )
}

fn plan_milestones() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert("project".to_string(), project_param());
    properties.insert(
        "team_size".to_string(),
        ParameterSchema::integer(Some("People working on the project (default 1)")),
    );
    properties.insert(
        "target_date".to_string(),
        ParameterSchema::string(Some("Desired completion date, YYYY-MM-DD")),
    );
    tool(
        "plan_milestones",
        "Propose a milestone plan for all open issues of a project. Nothing is saved until the plan is applied.",
        properties,
        &[],
    )
}

fn adjust_milestone_plan() -> ToolDefinition {
    let mut properties = HashMap::new();
    properties.insert(
        "action".to_string(),
        ParameterSchema::string_enum(
            Some("What to change"),
            &["move_issue", "rename", "retarget"],
        ),
    );
    properties.insert(
        "milestone".to_string(),
        ParameterSchema::string(Some("Milestone name or 1-based order in the plan")),
    );
    properties.insert(
        "issue".to_string(),
        ParameterSchema::string(Some("Issue to move (move_issue)")),
    );
    properties.insert(
        "name".to_string(),
        ParameterSchema::string(Some("New milestone name (rename)")),
    );
    properties.insert(
        "target_date".to_string(),
        ParameterSchema::string(Some("New target date, YYYY-MM-DD (retarget)")),
    );
    tool(
        "adjust_milestone_plan",
        "Edit the proposed plan: move an issue to another milestone, rename a milestone or change its target date.",
        properties,
        &["action", "milestone"],
    )
}

fn apply_milestone_plan() -> ToolDefinition {
    let mut milestone = HashMap::new();
    milestone.insert("name".to_string(), ParameterSchema::string(None));
    milestone.insert("description".to_string(), ParameterSchema::string(None));
    milestone.insert("target_date".to_string(), ParameterSchema::string(None));
    milestone.insert("order".to_string(), ParameterSchema::integer(None));
    milestone.insert("issue_ids".to_string(), string_list("Issues to assign"));

    let mut properties = HashMap::new();
    properties.insert("project".to_string(), project_param());
    properties.insert(
        "milestones".to_string(),
        ParameterSchema::array(
            Some("Milestones to create; omit to apply the proposed plan"),
            ParameterSchema::object(None, milestone, vec!["name".to_string(), "issue_ids".to_string()]),
        ),
    );
    tool(
        "apply_milestone_plan",
        "Create the planned milestones and assign their issues. Omit arguments to apply the plan just proposed.",
        properties,
        &[],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conversation::phase_for_skill;
    use crate::models::conversation::ConversationState;

    #[test]
    fn test_catalogue_is_complete() {
        let registry = SkillRegistry::builtin();
        assert_eq!(registry.len(), 16);
        assert!(registry.contains("apply_milestone_plan"));
        assert!(!registry.contains("drop_database"));
        assert_eq!(registry.names().next(), Some("search_issues"));
    }

    #[test]
    fn test_kinds_agree_with_phases() {
        let registry = SkillRegistry::builtin();
        for name in registry.names() {
            let expected = match registry.kind(name).unwrap() {
                SkillKind::Read => None,
                SkillKind::Analysis => Some(ConversationState::Reporting),
                SkillKind::Mutating | SkillKind::BatchApply => Some(ConversationState::Executing),
                SkillKind::Planning => Some(ConversationState::Planning),
            };
            assert_eq!(phase_for_skill(name), expected, "{}", name);
        }
    }

    #[test]
    fn test_mutating_flags() {
        let registry = SkillRegistry::builtin();
        assert!(registry.is_mutating("create_issue"));
        assert!(registry.is_mutating("apply_milestone_plan"));
        assert!(!registry.is_mutating("plan_milestones"));
        assert!(!registry.is_mutating("unknown"));
    }

    #[test]
    fn test_definitions_follow_registry_order() {
        let registry = SkillRegistry::builtin();
        let defs = registry.definitions_for(&["plan_milestones", "search_issues", "nope"]);
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["search_issues", "plan_milestones"]);
        assert_eq!(defs[0].input_schema.schema_type, "object");
    }
}
