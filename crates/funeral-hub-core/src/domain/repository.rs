//! Repository traits for the Funeral Hub core
//!
//! This module defines the persistence boundary of the workflow engine.
//! Store crates implement [`ProtocolStore`] and [`ProtocolTransaction`] to
//! provide row-locked, transactional access to protocols, their documents
//! and burial progress.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::burial::{BurialProgress, BurialProgressPatch};
use super::document::{Document, NewDocument};
use super::protocol::{DocumentationStatus, Protocol, ProtocolId, ProtocolMutation, ProtocolStatus};
use crate::CoreError;

/// Entry point to the protocol store
#[async_trait]
pub trait ProtocolStore: Send + Sync {
    /// Open a transaction. Dropping it without commit rolls back.
    async fn begin(&self) -> Result<Box<dyn ProtocolTransaction>, CoreError>;

    /// Read a protocol outside any transaction
    async fn read_protocol(&self, id: &ProtocolId) -> Result<Protocol, CoreError>;

    /// Documents of a protocol, oldest first
    async fn list_documents(&self, id: &ProtocolId) -> Result<Vec<Document>, CoreError>;

    /// Burial progress of a protocol, if any was ever recorded
    async fn read_burial_progress(
        &self,
        id: &ProtocolId,
    ) -> Result<Option<BurialProgress>, CoreError>;

    /// List protocols matching every filter set on `query`
    async fn list_protocols(&self, query: &ProtocolQuery) -> Result<Vec<Protocol>, CoreError>;
}

/// Unit of work over the protocol store.
///
/// None of these operations open or end the transaction; the caller decides
/// with [`commit`](ProtocolTransaction::commit) or
/// [`rollback`](ProtocolTransaction::rollback).
#[async_trait]
pub trait ProtocolTransaction: Send {
    /// Acquire the exclusive row lock, bounded by the store's lock wait
    async fn lock_protocol(&mut self, id: &ProtocolId) -> Result<Protocol, CoreError>;

    /// Insert a freshly created protocol
    async fn insert_protocol(&mut self, protocol: &Protocol) -> Result<(), CoreError>;

    /// Apply a structured partial update and return the updated row
    async fn apply_mutation(
        &mut self,
        id: &ProtocolId,
        mutation: &ProtocolMutation,
    ) -> Result<Protocol, CoreError>;

    /// Append a document
    async fn insert_document(&mut self, document: &NewDocument) -> Result<Document, CoreError>;

    /// Insert or update the burial progress record of a protocol
    async fn upsert_burial_progress(
        &mut self,
        id: &ProtocolId,
        patch: &BurialProgressPatch,
    ) -> Result<BurialProgress, CoreError>;

    /// Delete every document of a protocol, returning how many were removed
    async fn purge_documents(&mut self, id: &ProtocolId) -> Result<u64, CoreError>;

    /// Make every write of this transaction visible
    async fn commit(self: Box<Self>) -> Result<(), CoreError>;

    /// Discard every write of this transaction
    async fn rollback(self: Box<Self>) -> Result<(), CoreError>;
}

/// Filters for [`ProtocolStore::list_protocols`]. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolQuery {
    pub status: Option<ProtocolStatus>,
    /// Matches any of the listed documentation sub-states
    pub documentation_statuses: Vec<DocumentationStatus>,
    pub updated_before: Option<DateTime<Utc>>,
    pub finalized_before: Option<DateTime<Utc>>,
    pub closed_before: Option<DateTime<Utc>>,
    /// Only protocols whose documents were not purged yet
    pub not_purged: bool,
    /// Only protocols with a declarant whose access was not revoked yet
    pub declarant_not_revoked: bool,
    pub order: QueryOrder,
    pub limit: Option<i64>,
}

/// Result ordering for [`ProtocolQuery`]; applied before `limit`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryOrder {
    /// Most recently created first
    #[default]
    NewestCreated,
    /// Longest untouched first
    OldestUpdated,
    /// Earliest closed first, protocols never closed last
    OldestClosed,
}

impl QueryOrder {
    /// SQL `ORDER BY` clause for this ordering
    pub fn sql(&self) -> &'static str {
        match self {
            QueryOrder::NewestCreated => "created_at DESC, id",
            QueryOrder::OldestUpdated => "updated_at ASC, id",
            QueryOrder::OldestClosed => "closed_at ASC NULLS LAST, id",
        }
    }

    /// Sort `protocols` in place the way [`QueryOrder::sql`] would
    pub fn sort(&self, protocols: &mut [Protocol]) {
        match self {
            QueryOrder::NewestCreated => {
                protocols.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)))
            }
            QueryOrder::OldestUpdated => {
                protocols.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)))
            }
            QueryOrder::OldestClosed => protocols.sort_by(|a, b| {
                match (a.closed_at, b.closed_at) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
                .then(a.id.cmp(&b.id))
            }),
        }
    }
}

impl ProtocolQuery {
    pub fn with_status(status: ProtocolStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Whether `protocol` satisfies every filter
    pub fn matches(&self, protocol: &Protocol) -> bool {
        if let Some(status) = self.status {
            if protocol.status != status {
                return false;
            }
        }
        if !self.documentation_statuses.is_empty()
            && !self
                .documentation_statuses
                .contains(&protocol.documentation_status)
        {
            return false;
        }
        if let Some(before) = self.updated_before {
            if protocol.updated_at >= before {
                return false;
            }
        }
        if let Some(before) = self.finalized_before {
            match protocol.finalized_at {
                Some(at) if at < before => {}
                _ => return false,
            }
        }
        if let Some(before) = self.closed_before {
            match protocol.closed_at {
                Some(at) if at < before => {}
                _ => return false,
            }
        }
        if self.not_purged && protocol.documents_purged_at.is_some() {
            return false;
        }
        if self.declarant_not_revoked
            && (protocol.declarant_id.is_none() || protocol.declarant_access_revoked_at.is_some())
        {
            return false;
        }
        true
    }
}
