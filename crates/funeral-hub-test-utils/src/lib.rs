//! Testing utilities for Funeral Hub.
//!
//! This crate provides builders for actors and creation requests, mocks of
//! the core collaborator traits, fakes that record notifications, a harness
//! that wires the engine to the in-memory store, and protocol assertions.

pub mod assertions;
pub mod builders;
pub mod data_generators;
pub mod implementations;
pub mod mocks;

/// Re-export commonly used types for convenience
pub use mockall;

pub use builders::{NewProtocolBuilder, TestCast};
pub use implementations::{Milestone, RecordingNotificationDispatcher, TestHarness};
