//! In-memory protocol store for Funeral Hub
//!
//! This crate provides in-memory implementations of the store and identity
//! interfaces defined in the funeral-hub-core crate. Rows are locked with one
//! async mutex per protocol and transactional writes are staged until commit,
//! so the engine observes the same isolation it gets from PostgreSQL. It is
//! primarily useful for development and testing.

pub mod store;
pub use store::{InMemoryProtocolStore, InMemoryTransaction, DEFAULT_LOCK_WAIT};

pub mod users;
pub use users::InMemoryUserDirectory;
