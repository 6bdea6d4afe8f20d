//! Domain model for the Funeral Hub core
//!
//! Contains the protocol aggregate, its attachments, the transition table and
//! the repository, identity and notification boundaries.

pub mod action;
pub mod actor;
pub mod burial;
pub mod document;
pub mod finalization;
pub mod identity;
pub mod notification;
pub mod protocol;
pub mod repository;
pub mod transition;
