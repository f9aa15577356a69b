//! Utilities
//!
//! Common utilities used throughout the application.

pub mod error;
pub mod locale;
pub mod paths;

pub use error::*;
pub use locale::{Locale, Msg};
pub use paths::*;
