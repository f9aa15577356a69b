//! Storage Layer
//!
//! Handles persistence of the JSON config.

pub mod config;

pub use config::ConfigService;
