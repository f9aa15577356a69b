//! Gateway Implementations
//!
//! The `DomainGateway` contract lives in the core crate; this module holds
//! the in-process implementation.

pub mod memory;

pub use memory::InMemoryGateway;
