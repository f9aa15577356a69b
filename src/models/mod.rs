//! Data Models
//!
//! Contains the data structures shared across the application services.

pub mod conversation;
pub mod planning;
pub mod response;
pub mod settings;
pub mod skill;
pub mod snapshot;

pub use conversation::*;
pub use planning::*;
pub use response::*;
pub use settings::*;
pub use skill::*;
pub use snapshot::*;
