//! Conversation Summarizer
//!
//! Sliding-window compression of long histories. Head and tail messages are
//! kept verbatim; the middle span is replaced by one user-role message that
//! samples what the user asked for and which topics the assistant covered.
//!
//! A compressed history is at most `preserve_head + preserve_tail + 1` long,
//! which is below the threshold, so summarizing twice is a no-op.

use tracing::debug;
use tracker_assistant_llm::{Message, MessageContent, MessageRole};

use crate::models::settings::SummarizerConfig;

/// Sampled user intents and assistant headlines per summary.
const MAX_SAMPLES: usize = 3;
/// Character cap for each sampled line.
const SAMPLE_CHARS: usize = 80;
pub const SUMMARY_MARKER: &str = "[Earlier conversation summarized]";

/// History compressor
#[derive(Debug, Clone, Default)]
pub struct ConversationSummarizer {
    config: SummarizerConfig,
}

impl ConversationSummarizer {
    pub fn new(config: SummarizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Whether a history of this length gets compressed.
    pub fn should_summarize(&self, message_count: usize) -> bool {
        message_count > self.config.max_messages
    }

    /// Compress `messages`, or return them unchanged when short enough.
    pub fn summarize(&self, messages: &[Message]) -> Vec<Message> {
        if !self.should_summarize(messages.len()) {
            return messages.to_vec();
        }

        let (head_end, tail_start) = self.split_points(messages);
        if head_end >= tail_start {
            return messages.to_vec();
        }

        let middle = &messages[head_end..tail_start];
        let mut result = Vec::with_capacity(head_end + 1 + messages.len() - tail_start);
        result.extend_from_slice(&messages[..head_end]);
        result.push(Message::user(Self::describe(middle)));
        result.extend_from_slice(&messages[tail_start..]);

        debug!(
            before = messages.len(),
            after = result.len(),
            removed = middle.len(),
            "Summarized conversation history"
        );
        result
    }

    /// Head and tail boundaries, moved so that no tool result is separated
    /// from the call that produced it.
    fn split_points(&self, messages: &[Message]) -> (usize, usize) {
        let len = messages.len();
        let mut head_end = self.config.preserve_head.min(len);
        while head_end < len && is_tool_result(&messages[head_end]) {
            head_end += 1;
        }
        let mut tail_start = len.saturating_sub(self.config.preserve_tail).max(head_end);
        while tail_start < len && is_tool_result(&messages[tail_start]) {
            tail_start += 1;
        }
        (head_end, tail_start)
    }

    fn describe(middle: &[Message]) -> String {
        let intents: Vec<String> = middle
            .iter()
            .filter(|m| m.role == MessageRole::User && !m.has_tool_traffic())
            .filter_map(|m| first_line(&m.text_content()))
            .filter(|line| !line.starts_with(SUMMARY_MARKER))
            .collect();
        let headlines: Vec<String> = middle
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .filter_map(|m| first_line(&m.text_content()))
            .collect();

        let mut text = format!("{} {} messages condensed.", SUMMARY_MARKER, middle.len());
        if !intents.is_empty() {
            text.push_str("\nThe user asked:");
            for line in sample(&intents) {
                text.push_str("\n- ");
                text.push_str(&truncate(line, SAMPLE_CHARS));
            }
        }
        if !headlines.is_empty() {
            text.push_str("\nThe assistant covered:");
            for line in sample(&headlines) {
                text.push_str("\n- ");
                text.push_str(&truncate(line, SAMPLE_CHARS));
            }
        }
        text
    }
}

fn is_tool_result(message: &Message) -> bool {
    message
        .content
        .iter()
        .any(|c| matches!(c, MessageContent::ToolResult { .. }))
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Up to `MAX_SAMPLES` evenly spaced items, first and last included.
fn sample(items: &[String]) -> Vec<&String> {
    if items.len() <= MAX_SAMPLES {
        return items.iter().collect();
    }
    let last = items.len() - 1;
    (0..MAX_SAMPLES)
        .map(|i| &items[i * last / (MAX_SAMPLES - 1)])
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_messages(count: usize) -> Vec<Message> {
        (0..count)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("Question {}", i))
                } else {
                    Message::assistant(format!("Answer {}\nwith details", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_short_history_untouched() {
        let summarizer = ConversationSummarizer::default();
        let messages = make_messages(16);
        assert_eq!(summarizer.summarize(&messages), messages);
    }

    #[test]
    fn test_long_history_keeps_head_and_tail() {
        let summarizer = ConversationSummarizer::default();
        let messages = make_messages(20);
        let result = summarizer.summarize(&messages);

        assert_eq!(result.len(), 9);
        assert_eq!(result[..2], messages[..2]);
        assert_eq!(result[3..], messages[14..]);
        assert_eq!(result[2].role, MessageRole::User);

        let summary = result[2].text_content();
        assert!(summary.starts_with(SUMMARY_MARKER));
        assert!(summary.contains("12 messages condensed"));
        // first and last user intents of the middle span are sampled
        assert!(summary.contains("- Question 2"));
        assert!(summary.contains("- Question 12"));
        assert!(summary.contains("- Answer 3"));
        assert!(!summary.contains("with details"));
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let summarizer = ConversationSummarizer::default();
        let once = summarizer.summarize(&make_messages(40));
        let twice = summarizer.summarize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_samples_are_truncated() {
        let summarizer = ConversationSummarizer::default();
        let mut messages = make_messages(20);
        messages[4] = Message::user("x".repeat(200));
        let result = summarizer.summarize(&messages);
        let summary = result[2].text_content();
        let long_line = summary.lines().find(|l| l.contains("xxx")).unwrap();
        assert_eq!(long_line.chars().count(), 2 + SAMPLE_CHARS);
        assert!(long_line.ends_with("..."));
    }

    #[test]
    fn test_tool_results_stay_with_their_calls() {
        let summarizer = ConversationSummarizer::default();
        let mut messages = make_messages(20);
        // message 14 would start the tail; make it a tool result
        messages[14] = Message::tool_result("call_1", "search_issues", "[]", false);
        let result = summarizer.summarize(&messages);
        assert!(!is_tool_result(&result[3]));
        assert_eq!(result.last(), messages.last());
    }

    #[test]
    fn test_sample_spacing() {
        let items: Vec<String> = (0..7).map(|i| i.to_string()).collect();
        let picked: Vec<&str> = sample(&items).into_iter().map(|s| s.as_str()).collect();
        assert_eq!(picked, vec!["0", "3", "6"]);
    }
}
