//! Assertion utilities for protocols and notifications.
//!
//! Helpers return a `Result` with a descriptive error so they compose with
//! both `#[test]` functions and cucumber steps.

mod notifications;
mod protocol_state;

// Re-export all assertion helpers for easy access
pub use notifications::*;
pub use protocol_state::*;
