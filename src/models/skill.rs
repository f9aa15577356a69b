//! Skill Result Model
//!
//! The uniform outcome of every skill invocation, successful or not.

use serde::{Deserialize, Serialize};

/// Outcome of one skill call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillResult {
    pub skill_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub summary: String,
    pub execution_time_ms: u64,
    /// Held back by the approval gate; `data` carries the original arguments.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
}

impl SkillResult {
    /// Create a successful result
    pub fn ok(
        skill_name: impl Into<String>,
        data: serde_json::Value,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            skill_name: skill_name.into(),
            success: true,
            data: Some(data),
            error: None,
            summary: summary.into(),
            execution_time_ms: 0,
            pending: false,
        }
    }

    /// Create a failed result
    pub fn err(skill_name: impl Into<String>, error: impl Into<String>) -> Self {
        let skill_name = skill_name.into();
        let error = error.into();
        Self {
            summary: format!("{} failed: {}", skill_name, error),
            skill_name,
            success: false,
            data: None,
            error: Some(error),
            execution_time_ms: 0,
            pending: false,
        }
    }

    /// Create a result held for approval
    pub fn pending(skill_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        let skill_name = skill_name.into();
        Self {
            summary: format!("{} is waiting for confirmation", skill_name),
            skill_name,
            success: true,
            data: Some(arguments),
            error: None,
            execution_time_ms: 0,
            pending: true,
        }
    }

    pub fn with_elapsed(mut self, ms: u64) -> Self {
        self.execution_time_ms = ms;
        self
    }

    /// Content sent back to the model as the tool result.
    pub fn to_tool_content(&self) -> String {
        let payload = if self.success {
            serde_json::json!({
                "success": true,
                "summary": self.summary,
                "data": self.data,
            })
        } else {
            serde_json::json!({
                "success": false,
                "summary": self.summary,
                "error": self.error,
            })
        };
        payload.to_string()
    }
}
