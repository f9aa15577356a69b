//! Text Similarity Helpers
//!
//! Tokenization, Jaccard similarity and display-id mention detection over
//! issue text.

use std::collections::BTreeSet;

use regex::Regex;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "could", "do", "does",
    "for", "from", "has", "have", "how", "i", "if", "in", "into", "is", "it", "its", "me", "my",
    "not", "of", "on", "or", "our", "should", "so", "that", "the", "their", "then", "there",
    "these", "this", "to", "up", "us", "was", "we", "were", "what", "when", "which", "will",
    "with", "would", "you", "your",
];

/// Lowercase alphanumeric tokens of at least two characters, stop words removed.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// |A ∩ B| / |A ∪ B|; 0 when both sets are empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Matches a display id only at token boundaries, so `APP-1` never matches
/// inside `APP-12` or `XAPP-1`.
pub struct MentionMatcher {
    pattern: Option<Regex>,
}

impl MentionMatcher {
    pub fn new(display_id: &str) -> Self {
        let display_id = display_id.trim();
        let pattern = if display_id.is_empty() {
            None
        } else {
            Regex::new(&format!(
                r"(?i)(?:^|[^A-Za-z0-9_-]){}(?:$|[^A-Za-z0-9_])",
                regex::escape(display_id)
            ))
            .ok()
        };
        Self { pattern }
    }

    pub fn is_mentioned_in(&self, text: &str) -> bool {
        self.pattern.as_ref().map_or(false, |p| p.is_match(text))
    }
}

/// Round to three decimals for stable presentation.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
