//! Orchestrator Module
//!
//! Coordinates model provider calls with skill execution in an agentic loop,
//! with retry, rate and budget checks, and a no-model fallback answer.

mod fallback;
mod prompts;
mod retry;
mod service;

pub use fallback::fallback_reply;
pub use prompts::system_prompt;
pub use retry::backoff_delay;
pub use service::{Orchestrator, TurnRequest, MAX_MESSAGE_CHARS};
