//!
//! Funeral Hub Core - Protocol workflow engine for death registration
//!
//! This crate defines the protocol aggregate, the guarded transition table,
//! the finalization rule and the transactional engine that ties them to a
//! [`ProtocolStore`]. Storage backends, identity providers and notification
//! transports plug in through the traits re-exported here.

#![forbid(unsafe_code)]

/// Domain layer - protocol model, transition rules and collaborator traits
pub mod domain;

/// Application services - engine, service facade and housekeeping
pub mod application;

/// Engine and housekeeping configuration
pub mod config;

/// Error types
pub mod error;

pub use error::CoreError;

pub use application::housekeeping::{Housekeeping, HousekeepingReport, HousekeepingScheduler};
pub use application::protocol_service::ProtocolService;
pub use application::workflow_engine::WorkflowEngine;
pub use config::{EngineConfig, HousekeepingConfig};

pub use domain::action::{Action, ActionKind, NewProtocol};
pub use domain::actor::{Actor, GroupId, Role, RoleSlot, UserId};
pub use domain::burial::{BurialProgress, BurialProgressPatch, BurialStage};
pub use domain::document::{Document, DocumentId, DocumentKind, NewDocument, UploadedFile};
pub use domain::identity::{AccessRevoker, IdentityProvider};
pub use domain::notification::{
    BroadcastNotificationDispatcher, EventKind, Notification, NotificationDispatcher,
    NotificationTarget, TracingNotificationDispatcher,
};
pub use domain::protocol::{
    BurialStatus, Deceased, DocumentationStatus, Protocol, ProtocolId, ProtocolMutation,
    ProtocolStatus,
};
pub use domain::repository::{ProtocolQuery, ProtocolStore, ProtocolTransaction, QueryOrder};
