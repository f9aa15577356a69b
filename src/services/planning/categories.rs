//! Category Labels
//!
//! Category keys are short upper-case codes stored on issues ("FRONT",
//! "BACK"). Milestone names use a fixed label table; unknown keys label
//! themselves.

const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("FRONT", "Frontend"),
    ("BACK", "Backend"),
    ("API", "API"),
    ("DB", "Database"),
    ("INFRA", "Infrastructure"),
    ("DESIGN", "Design"),
    ("MOBILE", "Mobile"),
    ("DOCS", "Documentation"),
    ("QA", "QA"),
    ("SECURITY", "Security"),
];

/// Normalize a category key: trimmed, upper-case.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Split comma-separated entries, normalize, drop empties and duplicates.
///
/// `["FRONT,BACK"]`, `["front", "back"]` and `["FRONT", " BACK ", "front"]`
/// all become `["FRONT", "BACK"]`.
pub fn normalize_list<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        for part in value.as_ref().split(',') {
            let key = normalize_key(part);
            if !key.is_empty() && !out.contains(&key) {
                out.push(key);
            }
        }
    }
    out
}

/// Display label for a category key.
pub fn label_for(key: &str) -> String {
    let key = normalize_key(key);
    CATEGORY_LABELS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| label.to_string())
        .unwrap_or(key)
}

/// Whether the key is one of the known categories.
pub fn is_known(key: &str) -> bool {
    let key = normalize_key(key);
    CATEGORY_LABELS.iter().any(|(k, _)| *k == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_separated_normalization() {
        assert_eq!(normalize_list(&["FRONT,BACK"]), vec!["FRONT", "BACK"]);
        assert_eq!(normalize_list(&["front", " back "]), vec!["FRONT", "BACK"]);
        assert_eq!(normalize_list(&["FRONT", "front,", ""]), vec!["FRONT"]);
        assert!(normalize_list::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_labels() {
        assert_eq!(label_for("front"), "Frontend");
        assert_eq!(label_for("DB"), "Database");
        assert_eq!(label_for("payments"), "PAYMENTS");
        assert!(is_known("docs"));
        assert!(!is_known("payments"));
    }
}
