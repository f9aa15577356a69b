//! Tracker Assistant - Orchestration Library
//!
//! The conversation engine behind an issue tracker's AI assistant.
//! It includes:
//! - A conversation state machine and phase-dependent tool masks
//! - The skill dispatcher with its approval gate and error sanitizer
//! - Issue analysis and the deterministic milestone planner
//! - The agentic loop with retry, rate/budget guard and fallback
//! - Configuration storage and localized user messages

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::conversation::{ConversationContext, ConversationSession, ConversationState};
pub use models::response::*;
pub use models::settings::{AppConfig, SettingsUpdate};
pub use models::snapshot::DomainSnapshot;
pub use services::{InMemoryGateway, Orchestrator, RateGuard, TurnRequest};
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
