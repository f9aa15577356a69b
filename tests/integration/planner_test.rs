//! Milestone Planner Integration Tests
//!
//! Runs the planner over a realistic 20-issue project and verifies:
//! - Tier order: ready to ship, critical, then categories by size
//! - Every open issue lands in exactly one milestone
//! - Sequential target dates sized by velocity and team size
//! - Singleton demotion and target-date overrun reporting

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use tracker_assistant::services::planning::{MilestonePlanner, PlanRequest};
use tracker_assistant_core::{Issue, IssueStatus, IssueType, Priority};

use crate::support::{issue, now, twenty_issues};

// ============================================================================
// Helpers
// ============================================================================

fn request(issues: &[Issue]) -> PlanRequest<'_> {
    PlanRequest {
        project_id: "p-1",
        open_issues: issues,
        all_issues: None,
        team_size: 1,
        target_date: None,
        now: now(),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ids(range: std::ops::RangeInclusive<usize>) -> BTreeSet<String> {
    range.map(|n| format!("i-{}", n)).collect()
}

// ============================================================================
// Twenty-issue scenario
// ============================================================================

#[test]
fn test_twenty_issue_plan_tiers() {
    let issues = twenty_issues();
    let plan = MilestonePlanner::plan(&request(&issues));

    let names: Vec<&str> = plan
        .proposed_milestones
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["Ready to Ship", "Critical Fixes", "Frontend", "Backend"],
        "ship and critical tiers come first, then categories largest first"
    );

    let sizes: Vec<usize> = plan
        .proposed_milestones
        .iter()
        .map(|m| m.issue_ids.len())
        .collect();
    assert_eq!(sizes, vec![3, 2, 8, 7]);

    let ship: BTreeSet<String> = plan.proposed_milestones[0].issue_ids.iter().cloned().collect();
    assert_eq!(ship, ids(1..=3), "in-review issues are ready to ship");
    let critical: BTreeSet<String> = plan.proposed_milestones[1].issue_ids.iter().cloned().collect();
    assert_eq!(critical, ids(4..=5), "urgent bugs are critical");

    let orders: Vec<i32> = plan.proposed_milestones.iter().map(|m| m.order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
    assert!(plan.overrun_days.is_none());
    assert!(plan.warnings.is_empty());
}

#[test]
fn test_twenty_issue_plan_assigns_every_issue_once() {
    let issues = twenty_issues();
    let plan = MilestonePlanner::plan(&request(&issues));

    let planned: Vec<&String> = plan.issue_ids().collect();
    assert_eq!(planned.len(), 20, "no issue is duplicated");
    let planned: BTreeSet<String> = planned.into_iter().cloned().collect();
    let input: BTreeSet<String> = issues.iter().map(|i| i.id.clone()).collect();
    assert_eq!(planned, input, "the plan covers exactly the open issues");

    for milestone in &plan.proposed_milestones {
        assert_eq!(milestone.issue_ids.len(), milestone.issues_summary.len());
        assert!(milestone.issues_summary.iter().all(|line| line.starts_with("APP-")));
    }
}

#[test]
fn test_twenty_issue_schedule_uses_default_velocity() {
    let issues = twenty_issues();
    let plan = MilestonePlanner::plan(&request(&issues));

    // No closed issues: 5 per week. Ship is always one week.
    let dates: Vec<NaiveDate> = plan
        .proposed_milestones
        .iter()
        .map(|m| m.target_date)
        .collect();
    assert_eq!(
        dates,
        vec![
            date(2026, 6, 8),
            date(2026, 6, 15),
            date(2026, 6, 29),
            date(2026, 7, 13)
        ]
    );
    assert_eq!(plan.schedule_end, Some(date(2026, 7, 13)));
    assert!(plan.proposed_milestones[2].description.contains("8 issues, ~2 weeks"));
}

#[test]
fn test_larger_team_shortens_schedule() {
    let issues = twenty_issues();
    let mut req = request(&issues);
    req.team_size = 2;
    let plan = MilestonePlanner::plan(&req);
    assert_eq!(plan.schedule_end, Some(date(2026, 6, 29)));
}

#[test]
fn test_recent_throughput_is_capped() {
    let open = twenty_issues();
    let mut all = open.clone();
    // 48 done in the last four weeks is 12 per week, above the cap of 8.
    for n in 100..148 {
        let mut done = issue(n, IssueType::Feature, IssueStatus::Done, Priority::Medium, "FRONT");
        done.created_at = now() - Duration::days(20);
        done.updated_at = now() - Duration::days(2);
        all.push(done);
    }
    let mut req = request(&open);
    req.all_issues = Some(&all);
    let plan = MilestonePlanner::plan(&req);

    assert_eq!(plan.velocity.issues_per_week_4w, 12.0);
    // Frontend (8) and Backend (7) each fit in one week at 8 per week.
    assert_eq!(plan.schedule_end, Some(date(2026, 6, 29)));
}

#[test]
fn test_target_date_overrun_is_reported() {
    let issues = twenty_issues();
    let mut req = request(&issues);
    req.target_date = Some(date(2026, 6, 20));
    let plan = MilestonePlanner::plan(&req);

    assert_eq!(plan.overrun_days, Some(23));
    assert_eq!(plan.warnings.len(), 1);
    assert!(plan.warnings[0].contains("23 days"));
}

// ============================================================================
// Demotion and backlog
// ============================================================================

#[test]
fn test_singletons_and_low_priority_are_demoted() {
    let mut issues = twenty_issues();
    issues.push(issue(21, IssueType::Feature, IssueStatus::Todo, Priority::High, "DESIGN"));
    issues.push(issue(22, IssueType::Improvement, IssueStatus::Todo, Priority::Medium, "DOCS"));
    issues.push(issue(23, IssueType::Feature, IssueStatus::Todo, Priority::Low, "FRONT"));
    issues.push(issue(24, IssueType::Question, IssueStatus::Todo, Priority::Medium, "BACK"));

    let plan = MilestonePlanner::plan(&request(&issues));
    let names: Vec<&str> = plan
        .proposed_milestones
        .iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["Ready to Ship", "Critical Fixes", "Frontend", "Backend", "Backlog"]
    );

    let critical = &plan.proposed_milestones[1];
    assert!(
        critical.issue_ids.contains(&"i-21".to_string()),
        "a high-priority singleton is promoted to critical"
    );
    let backlog = plan.proposed_milestones.last().unwrap();
    let backlog_ids: BTreeSet<String> = backlog.issue_ids.iter().cloned().collect();
    assert_eq!(
        backlog_ids,
        ["i-22", "i-23", "i-24"].iter().map(|s| s.to_string()).collect()
    );
    assert_eq!(plan.issue_ids().count(), 24);
}

#[test]
fn test_plan_is_deterministic() {
    let issues = twenty_issues();
    let first = MilestonePlanner::plan(&request(&issues));
    let second = MilestonePlanner::plan(&request(&issues));
    assert_eq!(first, second);
}

#[test]
fn test_empty_input_gives_empty_plan() {
    let plan = MilestonePlanner::plan(&request(&[]));
    assert!(plan.proposed_milestones.is_empty());
    assert!(plan.schedule_end.is_none());
}
