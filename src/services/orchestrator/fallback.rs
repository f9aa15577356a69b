//! Deterministic Fallback
//!
//! When the model cannot produce a usable answer the turn still gets one,
//! assembled without any model call from this turn's skill summaries plus
//! metrics and priority suggestions computed over the snapshot.

use chrono::{DateTime, Utc};

use crate::models::skill::SkillResult;
use crate::models::snapshot::DomainSnapshot;
use crate::services::analysis::IssueAnalyzer;
use crate::utils::locale::{Locale, Msg};

/// Projects summarized in a fallback answer.
const MAX_PROJECTS: usize = 3;
/// Priority suggestions listed per project.
const TOP_PRIORITIES: usize = 3;

const ANALYSIS_SKILLS: &[&str] = &["get_project_metrics", "suggest_priorities"];

/// Best-effort answer from data already at hand.
pub fn fallback_reply(
    locale: Locale,
    skills_executed: &[SkillResult],
    snapshot: &DomainSnapshot,
    now: DateTime<Utc>,
) -> String {
    let mut lines: Vec<String> = skills_executed
        .iter()
        .filter(|r| r.success && !r.pending)
        .map(|r| format!("- {}", r.summary))
        .collect();

    let has_analysis = skills_executed
        .iter()
        .any(|r| r.success && ANALYSIS_SKILLS.contains(&r.skill_name.as_str()));
    if !has_analysis {
        lines.extend(snapshot_digest(snapshot, now));
    }

    if lines.is_empty() {
        return locale.text(Msg::NothingToReport).to_string();
    }
    format!("{}\n{}", locale.text(Msg::FallbackIntro), lines.join("\n"))
}

fn snapshot_digest(snapshot: &DomainSnapshot, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = Vec::new();
    for project in snapshot.projects.iter().take(MAX_PROJECTS) {
        let metrics = IssueAnalyzer::project_metrics(&project.id, &snapshot.issues, now);
        if metrics.total == 0 {
            continue;
        }
        lines.push(format!(
            "- {}: {} issues, {} open, {:.1} closed per week",
            project.name, metrics.total, metrics.open, metrics.velocity.issues_per_week_4w
        ));

        let issues: Vec<_> = snapshot.issues_for_project(&project.id).cloned().collect();
        let top = IssueAnalyzer::suggest_priorities(&issues, now, TOP_PRIORITIES);
        if !top.is_empty() {
            let items: Vec<String> = top
                .iter()
                .map(|s| format!("{} {}", s.display_id, s.title))
                .collect();
            lines.push(format!("  {}", items.join("; ")));
        }
    }
    lines
}
