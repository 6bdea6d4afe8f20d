use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use funeral_hub_core::{
    BurialProgress, BurialProgressPatch, CoreError, Document, NewDocument, Protocol, ProtocolId,
    ProtocolMutation, ProtocolQuery, ProtocolStore, ProtocolTransaction,
};

/// Lock wait applied when none is configured
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Clone)]
struct Tables {
    protocols: HashMap<ProtocolId, Protocol>,
    documents: HashMap<ProtocolId, Vec<Document>>,
    burial: HashMap<ProtocolId, BurialProgress>,
}

type RowLocks = Arc<Mutex<HashMap<ProtocolId, Arc<Mutex<()>>>>>;

/// In-memory implementation of the ProtocolStore
#[derive(Clone)]
pub struct InMemoryProtocolStore {
    tables: Arc<RwLock<Tables>>,
    row_locks: RowLocks,
    lock_wait: Duration,
}

impl Default for InMemoryProtocolStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProtocolStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_lock_wait(DEFAULT_LOCK_WAIT)
    }

    /// Create an empty store whose row locks give up after `lock_wait`
    pub fn with_lock_wait(lock_wait: Duration) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            row_locks: Arc::new(Mutex::new(HashMap::new())),
            lock_wait,
        }
    }

    /// Store a protocol as-is, bypassing the workflow
    pub async fn seed_protocol(&self, protocol: Protocol) {
        self.tables
            .write()
            .await
            .protocols
            .insert(protocol.id, protocol);
    }
}

#[async_trait]
impl ProtocolStore for InMemoryProtocolStore {
    async fn begin(&self) -> Result<Box<dyn ProtocolTransaction>, CoreError> {
        Ok(Box::new(InMemoryTransaction {
            tables: self.tables.clone(),
            row_locks: self.row_locks.clone(),
            lock_wait: self.lock_wait,
            guards: HashMap::new(),
            staged: Staged::default(),
        }))
    }

    async fn read_protocol(&self, id: &ProtocolId) -> Result<Protocol, CoreError> {
        self.tables
            .read()
            .await
            .protocols
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn list_documents(&self, id: &ProtocolId) -> Result<Vec<Document>, CoreError> {
        let mut documents = self
            .tables
            .read()
            .await
            .documents
            .get(id)
            .cloned()
            .unwrap_or_default();
        documents.sort_by_key(|document| document.uploaded_at);
        Ok(documents)
    }

    async fn read_burial_progress(
        &self,
        id: &ProtocolId,
    ) -> Result<Option<BurialProgress>, CoreError> {
        Ok(self.tables.read().await.burial.get(id).cloned())
    }

    async fn list_protocols(&self, query: &ProtocolQuery) -> Result<Vec<Protocol>, CoreError> {
        let tables = self.tables.read().await;
        let mut protocols: Vec<Protocol> = tables
            .protocols
            .values()
            .filter(|protocol| query.matches(protocol))
            .cloned()
            .collect();
        query.order.sort(&mut protocols);
        if let Some(limit) = query.limit {
            protocols.truncate(limit.max(0) as usize);
        }
        Ok(protocols)
    }
}

#[derive(Debug, Default)]
struct Staged {
    protocols: HashMap<ProtocolId, Protocol>,
    inserted: HashSet<ProtocolId>,
    documents: Vec<Document>,
    purged: HashSet<ProtocolId>,
    burial: HashMap<ProtocolId, BurialProgress>,
}

/// Transaction over the in-memory tables.
///
/// Writes are staged and only published by `commit`. Row locks are held until
/// the transaction is committed, rolled back or dropped.
pub struct InMemoryTransaction {
    tables: Arc<RwLock<Tables>>,
    row_locks: RowLocks,
    lock_wait: Duration,
    guards: HashMap<ProtocolId, OwnedMutexGuard<()>>,
    staged: Staged,
}

impl InMemoryTransaction {
    async fn row_lock(&self, id: &ProtocolId) -> Arc<Mutex<()>> {
        self.row_locks
            .lock()
            .await
            .entry(*id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Current view of a protocol: staged write first, then committed row
    async fn visible(&self, id: &ProtocolId) -> Option<Protocol> {
        if let Some(protocol) = self.staged.protocols.get(id) {
            return Some(protocol.clone());
        }
        self.tables.read().await.protocols.get(id).cloned()
    }

    async fn visible_or_not_found(&self, id: &ProtocolId) -> Result<Protocol, CoreError> {
        self.visible(id).await.ok_or_else(|| not_found(id))
    }
}

#[async_trait]
impl ProtocolTransaction for InMemoryTransaction {
    async fn lock_protocol(&mut self, id: &ProtocolId) -> Result<Protocol, CoreError> {
        if self.guards.contains_key(id) {
            return self.visible_or_not_found(id).await;
        }
        // Unknown ids fail fast instead of waiting on a lock nobody holds
        self.visible_or_not_found(id).await?;

        let row = self.row_lock(id).await;
        let guard = tokio::time::timeout(self.lock_wait, row.lock_owned())
            .await
            .map_err(|_| {
                CoreError::Contention(format!(
                    "Protocol {} is locked by another transaction",
                    id
                ))
            })?;
        self.guards.insert(*id, guard);
        debug!(protocol_id = %id, "Row lock acquired");

        self.visible_or_not_found(id).await
    }

    async fn insert_protocol(&mut self, protocol: &Protocol) -> Result<(), CoreError> {
        if self.visible(&protocol.id).await.is_some() {
            return Err(CoreError::Internal(format!(
                "Duplicate protocol id {}",
                protocol.id
            )));
        }
        let row = self.row_lock(&protocol.id).await;
        let guard = row.try_lock_owned().map_err(|_| {
            CoreError::Contention(format!("Protocol {} is locked", protocol.id))
        })?;
        self.guards.insert(protocol.id, guard);
        self.staged.inserted.insert(protocol.id);
        self.staged.protocols.insert(protocol.id, protocol.clone());
        Ok(())
    }

    async fn apply_mutation(
        &mut self,
        id: &ProtocolId,
        mutation: &ProtocolMutation,
    ) -> Result<Protocol, CoreError> {
        let current = self.visible_or_not_found(id).await?;
        let updated = current.with_mutation(mutation);
        self.staged.protocols.insert(*id, updated.clone());
        Ok(updated)
    }

    async fn insert_document(&mut self, document: &NewDocument) -> Result<Document, CoreError> {
        self.visible(&document.protocol_id).await.ok_or_else(|| {
            CoreError::Internal(format!(
                "Document references unknown protocol {}",
                document.protocol_id
            ))
        })?;
        let stored = Document::from_new(document);
        self.staged.documents.push(stored.clone());
        Ok(stored)
    }

    async fn upsert_burial_progress(
        &mut self,
        id: &ProtocolId,
        patch: &BurialProgressPatch,
    ) -> Result<BurialProgress, CoreError> {
        self.visible_or_not_found(id).await?;
        let now = Utc::now();
        let current = match self.staged.burial.get(id) {
            Some(progress) => progress.clone(),
            None => self
                .tables
                .read()
                .await
                .burial
                .get(id)
                .cloned()
                .unwrap_or_else(|| BurialProgress::empty(*id, now)),
        };
        let merged = current.merged(patch, now);
        self.staged.burial.insert(*id, merged.clone());
        Ok(merged)
    }

    async fn purge_documents(&mut self, id: &ProtocolId) -> Result<u64, CoreError> {
        let committed = if self.staged.purged.contains(id) {
            0
        } else {
            self.tables
                .read()
                .await
                .documents
                .get(id)
                .map_or(0, |documents| documents.len())
        };
        let before = self.staged.documents.len();
        self.staged.documents.retain(|document| document.protocol_id != *id);
        let staged = before - self.staged.documents.len();

        self.staged.purged.insert(*id);
        Ok((committed + staged) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        let InMemoryTransaction {
            tables,
            guards,
            staged,
            ..
        } = *self;

        {
            let mut tables = tables.write().await;
            for id in &staged.purged {
                tables.documents.remove(id);
            }
            for (id, protocol) in staged.protocols {
                tables.protocols.insert(id, protocol);
            }
            for document in staged.documents {
                tables
                    .documents
                    .entry(document.protocol_id)
                    .or_default()
                    .push(document);
            }
            for (id, progress) in staged.burial {
                tables.burial.insert(id, progress);
            }
        }

        debug!(
            rows = guards.len(),
            inserted = staged.inserted.len(),
            "Transaction committed"
        );
        drop(guards);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        debug!(rows = self.guards.len(), "Transaction rolled back");
        Ok(())
    }
}

fn not_found(id: &ProtocolId) -> CoreError {
    CoreError::NotFound(format!("Protocol {} not found", id))
}
