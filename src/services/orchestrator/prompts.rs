//! System Instructions
//!
//! The system prompt names the active tool mask, the projects the user can
//! refer to, today's date, and any plan awaiting confirmation.

use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::conversation::PendingPlan;
use crate::models::snapshot::DomainSnapshot;
use crate::services::skills::ToolMask;
use crate::utils::locale::Locale;

/// Projects listed individually before eliding.
const MAX_LISTED_PROJECTS: usize = 20;

const BASE_INSTRUCTIONS: &str = "You are an assistant embedded in an issue tracker. \
You help the user search, triage and plan issues and milestones by calling the \
tools you are given. Refer to issues by their display id (for example APP-12). \
Never invent ids; look them up first. Keep answers short and concrete.";

fn mask_guidance(mask: ToolMask) -> &'static str {
    match mask {
        ToolMask::Default => {
            "You can read, analyze and change issues and milestones. To plan milestones, call plan_milestones."
        }
        ToolMask::MilestonePlanning => {
            "A milestone plan is being prepared. Present the proposal and ask the user to confirm or adjust it."
        }
        ToolMask::MilestoneConfirm => {
            "A milestone plan is awaiting confirmation. Use adjust_milestone_plan for requested changes \
and apply_milestone_plan only after the user explicitly confirms."
        }
        ToolMask::ReadOnly => "You are reporting. Only read and analysis tools are available.",
        ToolMask::Creation => {
            "You are capturing new work. Check for duplicates with find_similar_issues before creating issues."
        }
    }
}

fn language_line(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Reply in English.",
        Locale::Es => "Responde en español.",
    }
}

/// Build the system prompt for one model round.
pub fn system_prompt(
    mask: ToolMask,
    snapshot: &DomainSnapshot,
    today: NaiveDate,
    locale: Locale,
    pending_plan: Option<&PendingPlan>,
) -> String {
    let mut prompt = String::from(BASE_INSTRUCTIONS);
    let _ = write!(prompt, "\n\nToday is {}.", today.format("%Y-%m-%d"));
    let _ = write!(prompt, "\nActive tool set: {}. {}", mask, mask_guidance(mask));

    if snapshot.projects.is_empty() {
        prompt.push_str("\n\nNo projects are loaded; call list_projects to discover them.");
    } else {
        prompt.push_str("\n\nProjects:");
        for project in snapshot.projects.iter().take(MAX_LISTED_PROJECTS) {
            let open = snapshot
                .issues_for_project(&project.id)
                .filter(|i| i.is_open())
                .count();
            let _ = write!(
                prompt,
                "\n- {} (prefix {}, id {}): {} open issue(s)",
                project.name, project.prefix, project.id, open
            );
        }
        if snapshot.projects.len() > MAX_LISTED_PROJECTS {
            let _ = write!(
                prompt,
                "\n- ... and {} more",
                snapshot.projects.len() - MAX_LISTED_PROJECTS
            );
        }
    }

    if let Some(plan) = pending_plan {
        prompt.push_str("\n\nPlan awaiting confirmation:");
        for milestone in &plan.milestones {
            let _ = write!(
                prompt,
                "\n{}. {} (target {}, {} issue(s))",
                milestone.order,
                milestone.name,
                milestone.target_date,
                milestone.issue_ids.len()
            );
        }
    }

    prompt.push_str("\n\n");
    prompt.push_str(language_line(locale));
    prompt
}
