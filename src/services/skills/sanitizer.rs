//! Error Sanitizer
//!
//! Gateway and provider errors are shown to the model and the user. Before
//! that they lose stack traces and credentials and are capped in length.

use std::sync::OnceLock;

use regex::Regex;

pub const MAX_ERROR_CHARS: usize = 300;

struct Patterns {
    stack_line: Regex,
    query: Regex,
    bearer: Regex,
    key_value: Regex,
    whitespace: Regex,
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                stack_line: Regex::new(
                    r"(?m)^\s*(at\s+\S.*|\d+:\s+0x[0-9a-f]+.*|stack backtrace:.*|Traceback.*|File \x22.*)$",
                )
                .ok()?,
                query: Regex::new(r"(https?://[^\s?#]+)\?[^\s#]*").ok()?,
                bearer: Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+").ok()?,
                key_value: Regex::new(
                    r"(?i)\b(api[_-]?key|key|token|secret|password|access_token)\s*[=:]\s*[^\s&,;]+",
                )
                .ok()?,
                whitespace: Regex::new(r"\s+").ok()?,
            })
        })
        .as_ref()
}

/// Sanitize an error message for display.
pub fn sanitize_error(raw: &str) -> String {
    let Some(p) = patterns() else {
        return truncate(raw.split_whitespace().collect::<Vec<_>>().join(" ").as_str());
    };
    let text = p.stack_line.replace_all(raw, "");
    let text = p.query.replace_all(&text, "$1?[redacted]");
    let text = p.bearer.replace_all(&text, "Bearer [redacted]");
    let text = p.key_value.replace_all(&text, "$1=[redacted]");
    let text = p.whitespace.replace_all(&text, " ");
    let text = text.trim();
    if text.is_empty() {
        return "unknown error".to_string();
    }
    truncate(text)
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_ERROR_CHARS - 3).collect();
    out.push_str("...");
    out
}
