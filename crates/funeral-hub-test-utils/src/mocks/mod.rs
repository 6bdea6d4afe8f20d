//! Mock implementations of the Funeral Hub collaborator traits.
//!
//! Transactions are not mocked here; use the in-memory store when a test
//! needs a real unit of work.

pub mod collaborators;
pub mod store;

// Re-export all mocks for easy access
pub use collaborators::*;
pub use store::*;
