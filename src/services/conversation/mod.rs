//! Conversation Services
//!
//! Phase tracking for a session and history compression before model calls.

pub mod state_machine;
pub mod summarizer;

pub use state_machine::{phase_for_skill, transition, ConversationEvent};
pub use summarizer::ConversationSummarizer;
