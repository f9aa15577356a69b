//! Milestone Planner
//!
//! Deterministic grouping of open issues into sequential milestones. The
//! planner never drops or duplicates an issue: the union of the returned
//! milestone issue ids is exactly the input id set.
//!
//! Tiers, in strict order:
//! 1. ready to ship: in review, or in progress with high priority
//! 2. critical: urgent, or high-priority bugs
//! 3. backlog candidates (low priority, questions) are set aside
//! 4. by first category, through the fixed label table
//! 5. by first free-form tag, else by type
//! 6. backlog: the set-aside issues plus demoted singleton buckets
//!    (high-priority singletons are promoted to critical instead)

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info};
use tracker_assistant_core::{Issue, IssueStatus, IssueType, Priority};

use super::categories;
use crate::models::planning::{MilestonePlan, ProposedMilestone, VelocityStats};
use crate::services::analysis::IssueAnalyzer;

/// Issues per week assumed when there is no recent throughput.
pub const DEFAULT_VELOCITY: f64 = 5.0;
/// Upper bound on per-person weekly throughput used for sizing.
pub const VELOCITY_CAP: f64 = 8.0;
/// Buckets smaller than this are demoted.
const MIN_BUCKET_SIZE: usize = 2;

/// Inputs for one planning run.
#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    pub project_id: &'a str,
    /// Issues to distribute; callers pass open issues.
    pub open_issues: &'a [Issue],
    /// Full snapshot for velocity; falls back to `open_issues`.
    pub all_issues: Option<&'a [Issue]>,
    pub team_size: usize,
    pub target_date: Option<NaiveDate>,
    pub now: DateTime<Utc>,
}

/// Working bucket before scheduling.
#[derive(Debug)]
struct Bucket<'a> {
    key: String,
    name: String,
    description: String,
    issues: Vec<&'a Issue>,
}

impl<'a> Bucket<'a> {
    fn new(key: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            issues: Vec::new(),
        }
    }
}

/// Milestone planner
pub struct MilestonePlanner;

impl MilestonePlanner {
    /// Build a plan. Pure and deterministic for a given request.
    pub fn plan(request: &PlanRequest<'_>) -> MilestonePlan {
        let issues = Self::dedupe(request.open_issues);
        let velocity = IssueAnalyzer::compute_velocity(
            request.all_issues.unwrap_or(request.open_issues),
            request.now,
        );
        let owned: Vec<Issue> = issues.iter().map(|i| (*i).clone()).collect();
        let dependencies = IssueAnalyzer::detect_dependencies(&owned);

        let mut ship = Bucket::new("ship", "Ready to Ship", "Work already in review or nearly done");
        let mut critical = Bucket::new("critical", "Critical Fixes", "Urgent work and high-priority bugs");
        let mut backlog = Bucket::new("backlog", "Backlog", "Low-priority work and open questions");
        let mut by_category: BTreeMap<String, Vec<&Issue>> = BTreeMap::new();
        let mut by_tag: BTreeMap<String, (String, Vec<&Issue>)> = BTreeMap::new();

        for issue in issues.iter().copied() {
            if Self::is_ready_to_ship(issue) {
                ship.issues.push(issue);
            } else if Self::is_critical(issue) {
                critical.issues.push(issue);
            } else if Self::is_backlog_candidate(issue) {
                backlog.issues.push(issue);
            } else if let Some(key) = categories::normalize_list(&issue.category).into_iter().next() {
                by_category.entry(key).or_default().push(issue);
            } else {
                let (key, name) = Self::tag_or_type_key(issue);
                by_tag.entry(key).or_insert_with(|| (name, Vec::new())).1.push(issue);
            }
        }

        let mut category_buckets: Vec<Bucket<'_>> = by_category
            .into_iter()
            .map(|(key, members)| {
                let label = categories::label_for(&key);
                let mut bucket = Bucket::new(
                    format!("category:{}", key),
                    label.clone(),
                    format!("{} work", label),
                );
                bucket.issues = members;
                bucket
            })
            .collect();
        let mut tag_buckets: Vec<Bucket<'_>> = by_tag
            .into_iter()
            .map(|(key, (name, members))| {
                let mut bucket = Bucket::new(key, name.clone(), format!("{} work", name));
                bucket.issues = members;
                bucket
            })
            .collect();

        for buckets in [&mut category_buckets, &mut tag_buckets] {
            Self::demote_small(buckets, &mut critical, &mut backlog);
            // BTreeMap iteration already ordered keys; stable sort keeps that on ties.
            buckets.sort_by(|a, b| b.issues.len().cmp(&a.issues.len()));
        }

        // Demotion appends; restore input order before ranking.
        let position: HashMap<&str, usize> = issues
            .iter()
            .enumerate()
            .map(|(i, issue)| (issue.id.as_str(), i))
            .collect();
        for bucket in [&mut critical, &mut backlog] {
            bucket
                .issues
                .sort_by_key(|i| position.get(i.id.as_str()).copied().unwrap_or(usize::MAX));
        }

        let mut ordered: Vec<Bucket<'_>> = Vec::new();
        ordered.push(ship);
        ordered.push(critical);
        ordered.extend(category_buckets);
        ordered.extend(tag_buckets);
        ordered.push(backlog);

        let team_size = request.team_size.max(1);
        let weekly = Self::realistic_velocity(&velocity, team_size);

        let mut cursor = request.now.date_naive();
        let mut proposed = Vec::new();
        for mut bucket in ordered.into_iter().filter(|b| !b.issues.is_empty()) {
            Self::sort_within(&mut bucket.issues);
            let weeks = if bucket.key == "ship" {
                1
            } else {
                ((bucket.issues.len() as f64) / weekly).ceil().max(1.0) as i64
            };
            cursor += Duration::weeks(weeks);

            proposed.push(ProposedMilestone {
                name: bucket.name,
                description: format!(
                    "{} ({} issue{}, ~{} week{})",
                    bucket.description,
                    bucket.issues.len(),
                    if bucket.issues.len() == 1 { "" } else { "s" },
                    weeks,
                    if weeks == 1 { "" } else { "s" }
                ),
                target_date: cursor,
                order: proposed.len() as i32 + 1,
                issue_ids: bucket.issues.iter().map(|i| i.id.clone()).collect(),
                issues_summary: bucket.issues.iter().map(|i| i.headline()).collect(),
            });
        }

        let schedule_end = proposed.last().map(|m| m.target_date);
        let mut warnings = Vec::new();
        let overrun_days = match (request.target_date, schedule_end) {
            (Some(target), Some(end)) if end > target => {
                let days = (end - target).num_days();
                warnings.push(format!(
                    "Schedule ends {} days after the target date {}",
                    days, target
                ));
                Some(days)
            }
            _ => None,
        };

        info!(
            project_id = %request.project_id,
            issues = issues.len(),
            milestones = proposed.len(),
            weekly_capacity = weekly,
            "Planned milestones"
        );

        MilestonePlan {
            project_id: request.project_id.to_string(),
            proposed_milestones: proposed,
            dependencies,
            velocity,
            schedule_end,
            overrun_days,
            warnings,
        }
    }

    /// `min(4-week velocity or default, cap) x team size`
    pub fn realistic_velocity(velocity: &VelocityStats, team_size: usize) -> f64 {
        let base = if velocity.issues_per_week_4w > 0.0 {
            velocity.issues_per_week_4w
        } else {
            DEFAULT_VELOCITY
        };
        base.min(VELOCITY_CAP) * team_size.max(1) as f64
    }

    fn is_ready_to_ship(issue: &Issue) -> bool {
        issue.status == IssueStatus::InReview
            || (issue.status == IssueStatus::InProgress && issue.priority == Some(Priority::High))
    }

    fn is_critical(issue: &Issue) -> bool {
        issue.priority == Some(Priority::Urgent)
            || (issue.priority == Some(Priority::High) && issue.issue_type == IssueType::Bug)
    }

    fn is_backlog_candidate(issue: &Issue) -> bool {
        issue.priority == Some(Priority::Low) || issue.issue_type == IssueType::Question
    }

    fn tag_or_type_key(issue: &Issue) -> (String, String) {
        match issue
            .tags
            .iter()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())
        {
            Some(tag) => (format!("tag:{}", tag.to_lowercase()), Self::title_case(tag)),
            None => {
                let name = match issue.issue_type {
                    IssueType::Feature => "Features",
                    IssueType::Improvement => "Improvements",
                    IssueType::Bug => "Bugs",
                    IssueType::Question => "Questions",
                };
                (format!("type:{}", issue.issue_type), name.to_string())
            }
        }
    }

    fn title_case(tag: &str) -> String {
        tag.split(['-', '_', ' '])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Move buckets below the minimum size into critical or backlog.
    fn demote_small<'a>(
        buckets: &mut Vec<Bucket<'a>>,
        critical: &mut Bucket<'a>,
        backlog: &mut Bucket<'a>,
    ) {
        let mut kept = Vec::with_capacity(buckets.len());
        for bucket in buckets.drain(..) {
            if bucket.issues.len() >= MIN_BUCKET_SIZE {
                kept.push(bucket);
                continue;
            }
            for issue in bucket.issues {
                debug!(issue = %issue.display_id, bucket = %bucket.key, "Demoting singleton bucket");
                if issue.priority == Some(Priority::High) {
                    critical.issues.push(issue);
                } else {
                    backlog.issues.push(issue);
                }
            }
        }
        *buckets = kept;
    }

    /// Priority rank first, then bugs before other types; stable otherwise.
    fn sort_within(issues: &mut [&Issue]) {
        issues.sort_by(|a, b| {
            Priority::rank(b.priority)
                .cmp(&Priority::rank(a.priority))
                .then_with(|| {
                    let a_bug = a.issue_type == IssueType::Bug;
                    let b_bug = b.issue_type == IssueType::Bug;
                    b_bug.cmp(&a_bug)
                })
        });
    }

    fn dedupe(issues: &[Issue]) -> Vec<&Issue> {
        let mut seen = HashSet::new();
        issues.iter().filter(|i| seen.insert(i.id.as_str())).collect()
    }
}
