//! Issue Analyzer
//!
//! Pure, stateless functions over issue snapshots: dependency detection,
//! velocity, per-project metrics, priority suggestions and similar-issue
//! lookup. Output depends only on the input order and the supplied `now`.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use tracker_assistant_core::{Issue, IssueStatus, IssueType, Priority};

use super::text::{jaccard, round3, tokenize, MentionMatcher};
use crate::models::planning::{
    DetectedDependency, PrioritySuggestion, ProjectMetrics, SimilarIssue, VelocityStats,
};

/// Below this similarity two issues are unrelated.
pub const MIN_SIMILARITY: f64 = 0.25;
/// Similarity needed for an edge when the issues share no category.
pub const UNCATEGORIZED_SIMILARITY: f64 = 0.4;
pub const MENTION_CONFIDENCE: f64 = 0.95;
const SHARED_CATEGORY_CAP: f64 = 0.9;
const SHARED_CATEGORY_BONUS: f64 = 0.2;
const UNCATEGORIZED_CAP: f64 = 0.8;
/// Closed issues older than this are not close-time samples.
const MAX_CLOSE_DAYS: f64 = 365.0;

/// Dependency and throughput analyzer for issue snapshots
pub struct IssueAnalyzer;

/// Per-issue precomputation for the pairwise scan.
struct Prepared<'a> {
    issue: &'a Issue,
    text: String,
    tokens: BTreeSet<String>,
    mention: MentionMatcher,
    categories: BTreeSet<String>,
}

impl IssueAnalyzer {
    /// Detect likely relationships between open issues.
    ///
    /// Each unordered pair yields at most one edge:
    /// 1. an explicit display-id mention (A checked before B),
    /// 2. otherwise, similarity of at least 0.25 with a shared category,
    /// 3. otherwise, similarity of at least 0.4 without one.
    ///
    /// Similarity edges point from the higher-priority (then more
    /// foundational type) issue; ties point from the earlier issue. Results
    /// are sorted by confidence, stable on ties, and capped at
    /// `max(20, floor(1.5 * n))`.
    pub fn detect_dependencies(issues: &[Issue]) -> Vec<DetectedDependency> {
        let prepared: Vec<Prepared<'_>> = issues
            .iter()
            .map(|issue| {
                let text = issue.text();
                Prepared {
                    issue,
                    tokens: tokenize(&text),
                    text,
                    mention: MentionMatcher::new(&issue.display_id),
                    categories: issue
                        .category
                        .iter()
                        .map(|c| c.trim().to_uppercase())
                        .filter(|c| !c.is_empty())
                        .collect(),
                }
            })
            .collect();

        let mut edges = Vec::new();
        for i in 0..prepared.len() {
            for j in (i + 1)..prepared.len() {
                if let Some(edge) = Self::edge_for_pair(&prepared[i], &prepared[j]) {
                    edges.push(edge);
                }
            }
        }

        edges.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });
        let cap = Self::edge_cap(issues.len());
        edges.truncate(cap);

        debug!(issues = issues.len(), edges = edges.len(), "Detected dependencies");
        edges
    }

    /// `max(20, floor(1.5 * n))`
    pub fn edge_cap(issue_count: usize) -> usize {
        (issue_count * 3 / 2).max(20)
    }

    fn edge_for_pair(a: &Prepared<'_>, b: &Prepared<'_>) -> Option<DetectedDependency> {
        if b.mention.is_mentioned_in(&a.text) {
            return Some(DetectedDependency {
                from_issue_id: a.issue.id.clone(),
                to_issue_id: b.issue.id.clone(),
                reason: format!("{} mentions {}", a.issue.display_id, b.issue.display_id),
                confidence: MENTION_CONFIDENCE,
            });
        }
        if a.mention.is_mentioned_in(&b.text) {
            return Some(DetectedDependency {
                from_issue_id: b.issue.id.clone(),
                to_issue_id: a.issue.id.clone(),
                reason: format!("{} mentions {}", b.issue.display_id, a.issue.display_id),
                confidence: MENTION_CONFIDENCE,
            });
        }

        let similarity = jaccard(&a.tokens, &b.tokens);
        if similarity < MIN_SIMILARITY {
            return None;
        }

        let shared: Vec<&String> = a.categories.intersection(&b.categories).collect();
        let (confidence, reason) = if !shared.is_empty() {
            (
                (similarity + SHARED_CATEGORY_BONUS).min(SHARED_CATEGORY_CAP),
                format!(
                    "similar scope ({:.0}%) in shared category {}",
                    similarity * 100.0,
                    shared[0]
                ),
            )
        } else if similarity >= UNCATEGORIZED_SIMILARITY {
            (
                similarity.min(UNCATEGORIZED_CAP),
                format!("similar scope ({:.0}%)", similarity * 100.0),
            )
        } else {
            return None;
        };

        let (from, to) = if Self::foundation_rank(b.issue) > Self::foundation_rank(a.issue) {
            (b.issue, a.issue)
        } else {
            (a.issue, b.issue)
        };

        Some(DetectedDependency {
            from_issue_id: from.id.clone(),
            to_issue_id: to.id.clone(),
            reason,
            confidence: round3(confidence),
        })
    }

    /// Priority rank first, then type rank.
    fn foundation_rank(issue: &Issue) -> (u8, u8) {
        (Priority::rank(issue.priority), issue.issue_type.rank())
    }

    /// Throughput over done issues relative to `now`.
    pub fn compute_velocity(issues: &[Issue], now: DateTime<Utc>) -> VelocityStats {
        let done: Vec<&Issue> = issues
            .iter()
            .filter(|i| i.status == IssueStatus::Done)
            .collect();

        let within = |days: i64| {
            let since = now - Duration::days(days);
            done.iter()
                .filter(|i| i.updated_at >= since && i.updated_at <= now)
                .count()
        };

        let close_days: Vec<f64> = done
            .iter()
            .map(|i| (i.updated_at - i.created_at).num_seconds() as f64 / 86_400.0)
            .filter(|d| *d > 0.0 && *d < MAX_CLOSE_DAYS)
            .collect();

        let avg_days_to_close = if close_days.is_empty() {
            None
        } else {
            Some(round3(close_days.iter().sum::<f64>() / close_days.len() as f64))
        };

        VelocityStats {
            issues_per_week_4w: round3(within(28) as f64 / 4.0),
            issues_per_week_8w: round3(within(56) as f64 / 8.0),
            avg_days_to_close,
            sample_size: close_days.len(),
        }
    }

    /// Counts by status, priority and type for one project.
    pub fn project_metrics(
        project_id: &str,
        issues: &[Issue],
        now: DateTime<Utc>,
    ) -> ProjectMetrics {
        let project_issues: Vec<Issue> = issues
            .iter()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect();

        let mut metrics = ProjectMetrics {
            project_id: project_id.to_string(),
            total: project_issues.len(),
            open: project_issues.iter().filter(|i| i.is_open()).count(),
            velocity: Self::compute_velocity(&project_issues, now),
            ..Default::default()
        };

        for issue in &project_issues {
            *metrics
                .by_status
                .entry(issue.status.as_str().to_string())
                .or_insert(0) += 1;
            let priority = issue.priority.map(|p| p.as_str()).unwrap_or("none");
            *metrics.by_priority.entry(priority.to_string()).or_insert(0) += 1;
            *metrics
                .by_type
                .entry(issue.issue_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        metrics
    }

    /// Rank open issues by what most deserves attention.
    ///
    /// Score: priority rank x 10, +5 for bugs, +1 per open week (max 8), +3
    /// per issue that depends on this one.
    pub fn suggest_priorities(
        issues: &[Issue],
        now: DateTime<Utc>,
        limit: usize,
    ) -> Vec<PrioritySuggestion> {
        let open: Vec<Issue> = issues.iter().filter(|i| i.is_open()).cloned().collect();
        let dependencies = Self::detect_dependencies(&open);

        let mut fan_out: HashMap<&str, usize> = HashMap::new();
        for dep in &dependencies {
            *fan_out.entry(dep.from_issue_id.as_str()).or_insert(0) += 1;
        }

        let mut suggestions: Vec<PrioritySuggestion> = open
            .iter()
            .map(|issue| {
                let mut reasons = Vec::new();
                let mut score = 0.0;

                let rank = Priority::rank(issue.priority);
                score += rank as f64 * 10.0;
                if let Some(p) = issue.priority {
                    reasons.push(format!("{} priority", p));
                } else {
                    reasons.push("no priority set".to_string());
                }

                if issue.issue_type == IssueType::Bug {
                    score += 5.0;
                    reasons.push("bug".to_string());
                }

                let weeks = ((now - issue.created_at).num_days().max(0) / 7).min(8);
                if weeks > 0 {
                    score += weeks as f64;
                    reasons.push(format!("open for {} week(s)", weeks));
                }

                let blocks = fan_out.get(issue.id.as_str()).copied().unwrap_or(0);
                if blocks > 0 {
                    score += blocks as f64 * 3.0;
                    reasons.push(format!("{} related issue(s) build on it", blocks));
                }

                PrioritySuggestion {
                    issue_id: issue.id.clone(),
                    display_id: issue.display_id.clone(),
                    title: issue.title.clone(),
                    score,
                    reasons,
                }
            })
            .collect();

        suggestions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        suggestions.truncate(limit);
        suggestions
    }

    /// Issues whose text resembles `text`, most similar first.
    pub fn find_similar(
        text: &str,
        candidates: &[Issue],
        exclude_id: Option<&str>,
        min_similarity: f64,
        limit: usize,
    ) -> Vec<SimilarIssue> {
        let target = tokenize(text);
        let mut similar: Vec<SimilarIssue> = candidates
            .iter()
            .filter(|i| Some(i.id.as_str()) != exclude_id)
            .filter_map(|issue| {
                let similarity = jaccard(&target, &tokenize(&issue.text()));
                (similarity >= min_similarity).then(|| SimilarIssue {
                    issue_id: issue.id.clone(),
                    display_id: issue.display_id.clone(),
                    title: issue.title.clone(),
                    similarity: round3(similarity),
                })
            })
            .collect();

        similar.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        similar.truncate(limit);
        similar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn issue(n: usize, title: &str) -> Issue {
        let ts = now() - Duration::days(3);
        Issue {
            id: format!("i-{}", n),
            project_id: "p-1".to_string(),
            milestone_id: None,
            display_id: format!("APP-{}", n),
            title: title.to_string(),
            description: None,
            issue_type: IssueType::Feature,
            status: IssueStatus::Todo,
            priority: Some(Priority::Medium),
            tags: vec![],
            category: vec![],
            assignee_ids: vec![],
            due_date: None,
            estimate: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    // ── detect_dependencies ──

    #[test]
    fn test_mention_edge() {
        let mut a = issue(1, "Checkout flow");
        a.description = Some("Blocked until APP-2 lands".to_string());
        let b = issue(2, "Payment API");
        let deps = IssueAnalyzer::detect_dependencies(&[a, b]);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].from_issue_id, "i-1");
        assert_eq!(deps[0].to_issue_id, "i-2");
        assert_eq!(deps[0].confidence, MENTION_CONFIDENCE);
    }

    #[test]
    fn test_mention_in_later_issue_points_back() {
        let a = issue(1, "Payment API");
        let mut b = issue(2, "Checkout flow");
        b.description = Some("needs APP-1".to_string());
        let deps = IssueAnalyzer::detect_dependencies(&[a, b]);
        assert_eq!(deps[0].from_issue_id, "i-2");
        assert_eq!(deps[0].to_issue_id, "i-1");
    }

    #[test]
    fn test_mention_boundary_prevents_prefix_match() {
        let mut a = issue(1, "Alpha");
        a.description = Some("See APP-12".to_string());
        let b = issue(12, "Omega");
        let c = issue(2, "Gamma");
        let deps = IssueAnalyzer::detect_dependencies(&[a, c, b]);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].to_issue_id, "i-12");
    }

    #[test]
    fn test_shared_category_edge_direction_by_priority() {
        let mut a = issue(1, "dashboard chart rendering slow");
        a.category = vec!["FRONT".to_string()];
        a.priority = Some(Priority::Low);
        let mut b = issue(2, "dashboard chart rendering broken");
        b.category = vec!["front".to_string()];
        b.priority = Some(Priority::High);

        let deps = IssueAnalyzer::detect_dependencies(&[a, b]);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].from_issue_id, "i-2");
        // similarity 3/5 = 0.6, +0.2, capped at 0.9
        assert_eq!(deps[0].confidence, 0.8);
    }

    #[test]
    fn test_equal_rank_points_from_earlier_issue() {
        let mut a = issue(1, "export report csv");
        a.category = vec!["API".to_string()];
        let mut b = issue(2, "export report pdf");
        b.category = vec!["API".to_string()];
        let deps = IssueAnalyzer::detect_dependencies(&[a, b]);
        assert_eq!(deps[0].from_issue_id, "i-1");
    }

    #[test]
    fn test_type_rank_breaks_priority_tie() {
        let mut a = issue(1, "search index rebuild");
        a.issue_type = IssueType::Bug;
        let mut b = issue(2, "search index rebuild");
        b.issue_type = IssueType::Feature;
        let deps = IssueAnalyzer::detect_dependencies(&[a, b]);
        assert_eq!(deps[0].from_issue_id, "i-2");
        // identical text, no shared category: min(0.8, 1.0)
        assert_eq!(deps[0].confidence, 0.8);
    }

    #[test]
    fn test_low_similarity_without_category_is_skipped() {
        // similarity 1/3 is above 0.25 but below 0.4
        let a = issue(1, "login timeout");
        let b = issue(2, "login redirect");
        assert!(IssueAnalyzer::detect_dependencies(&[a, b]).is_empty());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let issues: Vec<Issue> = (1..=12)
            .map(|n| issue(n, &format!("shared words alpha beta {}", n % 3)))
            .collect();
        let first = IssueAnalyzer::detect_dependencies(&issues);
        for _ in 0..5 {
            assert_eq!(IssueAnalyzer::detect_dependencies(&issues), first);
        }
    }

    #[test]
    fn test_edge_cap() {
        assert_eq!(IssueAnalyzer::edge_cap(0), 20);
        assert_eq!(IssueAnalyzer::edge_cap(13), 20);
        assert_eq!(IssueAnalyzer::edge_cap(15), 22);
        assert_eq!(IssueAnalyzer::edge_cap(40), 60);

        let issues: Vec<Issue> = (1..=30).map(|n| issue(n, "identical text here")).collect();
        let deps = IssueAnalyzer::detect_dependencies(&issues);
        assert_eq!(deps.len(), 45);
    }

    // ── compute_velocity ──

    #[test]
    fn test_velocity_windows() {
        let mut issues = Vec::new();
        for (n, days_ago) in [(1, 3), (2, 10), (3, 40), (4, 100)] {
            let mut i = issue(n, "done work");
            i.status = IssueStatus::Done;
            i.created_at = now() - Duration::days(days_ago + 4);
            i.updated_at = now() - Duration::days(days_ago);
            issues.push(i);
        }
        issues.push(issue(5, "still open"));

        let v = IssueAnalyzer::compute_velocity(&issues, now());
        assert_eq!(v.issues_per_week_4w, 0.5);
        assert_eq!(v.issues_per_week_8w, 0.375);
        assert_eq!(v.avg_days_to_close, Some(4.0));
        assert_eq!(v.sample_size, 4);
    }

    #[test]
    fn test_velocity_without_samples() {
        let mut i = issue(1, "instant close");
        i.status = IssueStatus::Done;
        i.updated_at = i.created_at;
        let v = IssueAnalyzer::compute_velocity(&[i], now());
        assert!(v.avg_days_to_close.is_none());
        assert_eq!(v.sample_size, 0);
        assert_eq!(v.issues_per_week_4w, 0.25);
    }

    // ── metrics / suggestions / similarity ──

    #[test]
    fn test_project_metrics_counts() {
        let mut done = issue(1, "a");
        done.status = IssueStatus::Done;
        let mut bug = issue(2, "b");
        bug.issue_type = IssueType::Bug;
        bug.priority = None;
        let mut other = issue(3, "c");
        other.project_id = "p-2".to_string();

        let m = IssueAnalyzer::project_metrics("p-1", &[done, bug, other], now());
        assert_eq!(m.total, 2);
        assert_eq!(m.open, 1);
        assert_eq!(m.by_status["done"], 1);
        assert_eq!(m.by_priority["none"], 1);
        assert_eq!(m.by_type["bug"], 1);
    }

    #[test]
    fn test_suggest_priorities_orders_by_score() {
        let mut urgent_bug = issue(1, "crash on save");
        urgent_bug.priority = Some(Priority::Urgent);
        urgent_bug.issue_type = IssueType::Bug;
        let mut low = issue(2, "tweak copy");
        low.priority = Some(Priority::Low);
        let mut closed = issue(3, "old");
        closed.status = IssueStatus::Done;

        let s = IssueAnalyzer::suggest_priorities(&[low, urgent_bug, closed], now(), 10);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].display_id, "APP-1");
        assert!(s[0].reasons.iter().any(|r| r == "bug"));
    }

    #[test]
    fn test_find_similar_excludes_self() {
        let a = issue(1, "login page broken");
        let b = issue(2, "login page slow");
        let c = issue(3, "billing export");
        let similar =
            IssueAnalyzer::find_similar(&a.text(), &[a.clone(), b, c], Some("i-1"), 0.2, 5);
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].display_id, "APP-2");
        assert_eq!(similar[0].similarity, 0.5);
    }
}
