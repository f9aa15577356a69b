//! Services
//!
//! Business logic services for the assistant.

pub mod analysis;
pub mod conversation;
pub mod gateway;
pub mod guard;
pub mod orchestrator;
pub mod planning;
pub mod skills;

pub use analysis::IssueAnalyzer;
pub use conversation::ConversationSummarizer;
pub use gateway::InMemoryGateway;
pub use guard::RateGuard;
pub use orchestrator::{Orchestrator, TurnRequest};
pub use planning::MilestonePlanner;
pub use skills::{ApprovalGate, SkillDispatcher, SkillRegistry, ToolMask};
