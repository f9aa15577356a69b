//! Skill System
//!
//! The fixed set of named operations the model may call against the tracker.
//!
//! Architecture:
//! - registry.rs:   Skill kinds and tool definitions
//! - masks.rs:      Which skills each conversation phase exposes
//! - args.rs:       Argument validation and coercion
//! - resolver.rs:   Project reference resolution and inference
//! - approval.rs:   Confirmation gate for mutating skills
//! - sanitizer.rs:  Error message cleanup
//! - dispatcher.rs: Execution and result normalization

pub mod approval;
pub mod args;
pub mod dispatcher;
pub mod masks;
pub mod registry;
pub mod resolver;
pub mod sanitizer;

pub use approval::ApprovalGate;
pub use dispatcher::{DispatchEnv, SkillDispatcher};
pub use masks::{select_mask, ToolMask};
pub use registry::{SkillKind, SkillRegistry};
pub use sanitizer::sanitize_error;
