//! Issue Analysis
//!
//! Heuristic dependency detection, velocity, metrics, priority ranking and
//! similarity search over issue records.

pub mod analyzer;
pub mod text;

pub use analyzer::IssueAnalyzer;
