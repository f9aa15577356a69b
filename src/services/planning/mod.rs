//! Milestone Planning
//!
//! Deterministic tiered grouping of open issues into dated milestones.

pub mod categories;
pub mod planner;

pub use planner::{MilestonePlanner, PlanRequest};
