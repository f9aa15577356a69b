//! Approval Gate
//!
//! Holds mutating skills until the user confirms them. When confirmation is
//! required the dispatcher returns a pending result instead of calling the
//! gateway; the caller asks the user and re-runs approved calls with the gate
//! bypassed. Each session may also "always allow" individual skills.
//!
//! Thread-safe: designed to be wrapped in `Arc` and shared by orchestrators.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tracing::debug;

use crate::services::skills::registry::SkillRegistry;

/// Central approval gate for mutating skills
#[derive(Debug, Default)]
pub struct ApprovalGate {
    require_confirmation: bool,
    /// Per-session "always allow" skill sets.
    session_allow_rules: RwLock<HashMap<String, HashSet<String>>>,
}

impl ApprovalGate {
    pub fn new(require_confirmation: bool) -> Self {
        Self {
            require_confirmation,
            session_allow_rules: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.require_confirmation
    }

    /// Whether `skill` must be confirmed before it runs in this session.
    pub fn needs_approval(&self, registry: &SkillRegistry, session_id: &str, skill: &str) -> bool {
        if !self.require_confirmation || !registry.is_mutating(skill) {
            return false;
        }
        let rules = self
            .session_allow_rules
            .read()
            .unwrap_or_else(|e| e.into_inner());
        let allowed = rules
            .get(session_id)
            .map_or(false, |skills| skills.contains(skill));
        !allowed
    }

    /// Stop asking about `skill` for the rest of this session.
    pub fn allow_always(&self, session_id: &str, skill: &str) {
        debug!(session_id, skill, "Skill allowed for session");
        let mut rules = self
            .session_allow_rules
            .write()
            .unwrap_or_else(|e| e.into_inner());
        rules
            .entry(session_id.to_string())
            .or_default()
            .insert(skill.to_string());
    }

    /// Forget a session's allow rules.
    pub fn clear_session(&self, session_id: &str) {
        let mut rules = self
            .session_allow_rules
            .write()
            .unwrap_or_else(|e| e.into_inner());
        rules.remove(session_id);
    }
}
