//! Tracker Assistant Core
//!
//! Foundational types for the Tracker Assistant workspace: the domain snapshot
//! records the assistant reasons about, the gateway contract through which it
//! writes back to the tracker, and the shared error type. This crate has zero
//! dependencies on application-level code (LLM providers, orchestration, CLI).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `models` - Issue, Project, Milestone, Comment snapshots and their enums
//! - `gateway` - The `DomainGateway` trait and its request types
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/async-trait/thiserror/chrono**
//! 2. **Trait-based abstractions** - the gateway is mocked in tests and swapped per host
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod gateway;
pub mod models;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Domain Snapshots ───────────────────────────────────────────────────
pub use models::{Comment, Issue, IssueStatus, IssueType, Milestone, Priority, Project};

// ── Gateway Contract ───────────────────────────────────────────────────
pub use gateway::{DomainGateway, IssueFilter, IssueUpdate, MilestoneUpdate, NewIssue, NewMilestone};
