//! Behaviour when a collaborator misbehaves: notification transport down,
//! store unreachable, unknown identities, revocation errors, and a
//! transition dropped halfway through its unit of work.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use funeral_hub_core::{
    Action, BurialProgress, BurialProgressPatch, CoreError, Document, DocumentationStatus,
    EngineConfig, Housekeeping, HousekeepingConfig, NewDocument, Protocol, ProtocolId,
    ProtocolMutation, ProtocolQuery, ProtocolService, ProtocolStatus, ProtocolStore,
    ProtocolTransaction, WorkflowEngine,
};
use funeral_hub_state_inmemory::InMemoryProtocolStore;
use funeral_hub_test_utils::assertions::assert_nothing_notified;
use funeral_hub_test_utils::data_generators::faf_form;
use funeral_hub_test_utils::mocks::{
    create_failing_dispatcher, create_fixed_identity, create_unavailable_store,
    MockAccessRevoker, MockIdentityProvider, MockNotificationDispatcher, MockProtocolStore,
};
use funeral_hub_test_utils::{
    Milestone, NewProtocolBuilder, RecordingNotificationDispatcher, TestCast, TestHarness,
};
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

/// Create a protocol and walk it to the point where the FAF is due
async fn awaiting_faf(engine: &WorkflowEngine, cast: &TestCast) -> Protocol {
    let protocol = engine
        .create_protocol(&cast.intake, NewProtocolBuilder::new().build())
        .await
        .unwrap();
    engine
        .transition(&protocol.id, Action::ConfirmValidation, &cast.intake)
        .await
        .unwrap();
    engine
        .transition(
            &protocol.id,
            Action::DesignateStakeholders {
                funeral_home_id: Some(cast.funeral_home.id),
                notary_id: Some(cast.notary.id),
                declarant_id: Some(cast.declarant.id),
            },
            &cast.intake,
        )
        .await
        .unwrap()
}

fn submit_faf() -> Action {
    Action::SubmitFaf {
        file: Some(faf_form()),
    }
}

#[tokio::test]
async fn test_failed_delivery_keeps_the_committed_transition() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let fail_next = Arc::new(AtomicBool::new(false));
    let mut dispatcher = MockNotificationDispatcher::new();
    let (counted, failing) = (attempts.clone(), fail_next.clone());
    dispatcher.expect_notify().returning(move |_| {
        counted.fetch_add(1, Ordering::SeqCst);
        if failing.swap(false, Ordering::SeqCst) {
            Err(CoreError::Internal("transport down".to_string()))
        } else {
            Ok(())
        }
    });

    let store = InMemoryProtocolStore::new();
    let engine = WorkflowEngine::new(
        Arc::new(store.clone()),
        Arc::new(dispatcher),
        EngineConfig::default(),
    );
    let cast = TestCast::default();
    let protocol = awaiting_faf(&engine, &cast).await;

    let before = attempts.load(Ordering::SeqCst);
    fail_next.store(true, Ordering::SeqCst);
    let started = engine
        .transition(&protocol.id, submit_faf(), &cast.intake)
        .await
        .unwrap();
    assert_eq!(started.status, ProtocolStatus::ParallelExecution);

    // funeral home, notary and declarant are each told, even after the first failure
    assert_eq!(attempts.load(Ordering::SeqCst) - before, 3);
    assert!(!fail_next.load(Ordering::SeqCst));

    let stored = store.read_protocol(&protocol.id).await.unwrap();
    assert_eq!(stored.status, ProtocolStatus::ParallelExecution);
    assert_eq!(stored.documentation_status, DocumentationStatus::AwaitingDraft);
}

#[tokio::test]
async fn test_transitions_proceed_with_delivery_down() {
    let store = InMemoryProtocolStore::new();
    let engine = WorkflowEngine::new(
        Arc::new(store.clone()),
        Arc::new(create_failing_dispatcher()),
        EngineConfig::default(),
    );
    let cast = TestCast::default();
    let protocol = awaiting_faf(&engine, &cast).await;
    assert_eq!(protocol.status, ProtocolStatus::AwaitingFafSignatures);

    engine
        .transition(&protocol.id, submit_faf(), &cast.intake)
        .await
        .unwrap();
    assert_eq!(
        store.read_protocol(&protocol.id).await.unwrap().status,
        ProtocolStatus::ParallelExecution
    );
}

#[tokio::test]
async fn test_unreachable_store_surfaces_as_internal() {
    let cast = TestCast::default();
    let engine = Arc::new(WorkflowEngine::new(
        Arc::new(create_unavailable_store()),
        Arc::new(RecordingNotificationDispatcher::new()),
        EngineConfig::default(),
    ));
    let service = ProtocolService::new(Arc::new(create_fixed_identity(cast.intake)), engine);
    let token = TestCast::token(&cast.intake);
    let id = ProtocolId::new();

    let errors = [
        service.get(&token, &id).await.unwrap_err(),
        service.documents(&token, &id).await.unwrap_err(),
        service.list(&token, &ProtocolQuery::default()).await.unwrap_err(),
        service
            .create(&token, NewProtocolBuilder::new().build())
            .await
            .unwrap_err(),
        service
            .transition(&token, &id, Action::ConfirmValidation)
            .await
            .unwrap_err(),
    ];
    for err in errors {
        assert_eq!(err.kind(), "internal", "{}", err);
        assert!(!err.public_message().contains("database"));
    }
}

#[tokio::test]
async fn test_rejected_identity_never_reaches_the_store() {
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_resolve()
        .times(2)
        .returning(|token| Err(CoreError::Unauthenticated(format!("unknown token {:?}", token))));
    let engine = Arc::new(WorkflowEngine::new(
        Arc::new(MockProtocolStore::new()),
        Arc::new(RecordingNotificationDispatcher::new()),
        EngineConfig::default(),
    ));
    let service = ProtocolService::new(Arc::new(identity), engine);
    let id = ProtocolId::new();

    let read = service.get("expired", &id).await.unwrap_err();
    assert_eq!(read.kind(), "unauthenticated");
    let write = service
        .transition("expired", &id, Action::ConfirmValidation)
        .await
        .unwrap_err();
    assert_eq!(write.kind(), "unauthenticated");
}

#[tokio::test]
async fn test_failed_revocation_is_retried_on_the_next_run() {
    let harness = TestHarness::new().await;
    let protocol = harness.drive_to(Milestone::Finalized).await.unwrap();
    let declarant = harness.cast.declarant.id;

    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let mut revoker = MockAccessRevoker::new();
    revoker
        .expect_revoke_access()
        .withf(move |user| *user == declarant)
        .times(2)
        .returning(move |_| {
            if counted.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(CoreError::Internal("directory unreachable".to_string()))
            } else {
                Ok(true)
            }
        });
    let housekeeping = Housekeeping::new(
        Arc::new(harness.store.clone()),
        Arc::new(harness.notifications.clone()),
        Arc::new(revoker),
        HousekeepingConfig::default(),
    );

    let closing_time = Utc::now() + Duration::hours(73);
    housekeeping.run_once(closing_time).await;

    let failed = housekeeping.run_once(closing_time + Duration::days(31)).await;
    assert_eq!(failed.revoked, 0);
    assert_eq!(failed.failures.len(), 1);
    assert!(failed.failures[0].starts_with("revoke_declarant_access"));
    let stored = harness.read(&protocol.id).await.unwrap();
    assert!(stored.declarant_access_revoked_at.is_none());

    let retried = housekeeping.run_once(closing_time + Duration::days(32)).await;
    assert_eq!(retried.revoked, 1);
    assert!(retried.failures.is_empty(), "{:?}", retried.failures);
    let stored = harness.read(&protocol.id).await.unwrap();
    assert!(stored.declarant_access_revoked_at.is_some());
}

/// Store whose next transaction stalls forever right after its first write
#[derive(Clone)]
struct StallingStore {
    inner: InMemoryProtocolStore,
    armed: Arc<AtomicBool>,
    stalled: Arc<Notify>,
}

#[async_trait]
impl ProtocolStore for StallingStore {
    async fn begin(&self) -> Result<Box<dyn ProtocolTransaction>, CoreError> {
        Ok(Box::new(StallingTransaction {
            inner: self.inner.begin().await?,
            stall: self.armed.swap(false, Ordering::SeqCst),
            stalled: self.stalled.clone(),
        }))
    }

    async fn read_protocol(&self, id: &ProtocolId) -> Result<Protocol, CoreError> {
        self.inner.read_protocol(id).await
    }

    async fn list_documents(&self, id: &ProtocolId) -> Result<Vec<Document>, CoreError> {
        self.inner.list_documents(id).await
    }

    async fn read_burial_progress(
        &self,
        id: &ProtocolId,
    ) -> Result<Option<BurialProgress>, CoreError> {
        self.inner.read_burial_progress(id).await
    }

    async fn list_protocols(&self, query: &ProtocolQuery) -> Result<Vec<Protocol>, CoreError> {
        self.inner.list_protocols(query).await
    }
}

struct StallingTransaction {
    inner: Box<dyn ProtocolTransaction>,
    stall: bool,
    stalled: Arc<Notify>,
}

#[async_trait]
impl ProtocolTransaction for StallingTransaction {
    async fn lock_protocol(&mut self, id: &ProtocolId) -> Result<Protocol, CoreError> {
        self.inner.lock_protocol(id).await
    }

    async fn insert_protocol(&mut self, protocol: &Protocol) -> Result<(), CoreError> {
        self.inner.insert_protocol(protocol).await
    }

    async fn apply_mutation(
        &mut self,
        id: &ProtocolId,
        mutation: &ProtocolMutation,
    ) -> Result<Protocol, CoreError> {
        let updated = self.inner.apply_mutation(id, mutation).await?;
        if self.stall {
            self.stalled.notify_one();
            std::future::pending::<()>().await;
        }
        Ok(updated)
    }

    async fn insert_document(&mut self, document: &NewDocument) -> Result<Document, CoreError> {
        self.inner.insert_document(document).await
    }

    async fn upsert_burial_progress(
        &mut self,
        id: &ProtocolId,
        patch: &BurialProgressPatch,
    ) -> Result<BurialProgress, CoreError> {
        self.inner.upsert_burial_progress(id, patch).await
    }

    async fn purge_documents(&mut self, id: &ProtocolId) -> Result<u64, CoreError> {
        self.inner.purge_documents(id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        self.inner.rollback().await
    }
}

#[tokio::test]
async fn test_aborted_transition_leaves_no_trace() {
    let store = StallingStore {
        inner: InMemoryProtocolStore::with_lock_wait(std::time::Duration::from_millis(200)),
        armed: Arc::new(AtomicBool::new(false)),
        stalled: Arc::new(Notify::new()),
    };
    let notifications = RecordingNotificationDispatcher::new();
    let engine = Arc::new(WorkflowEngine::new(
        Arc::new(store.clone()),
        Arc::new(notifications.clone()),
        EngineConfig::default(),
    ));
    let cast = TestCast::default();
    let protocol = awaiting_faf(&engine, &cast).await;
    let documents_before = store.list_documents(&protocol.id).await.unwrap();
    notifications.clear();

    store.armed.store(true, Ordering::SeqCst);
    let task = {
        let engine = engine.clone();
        let id = protocol.id;
        let intake = cast.intake;
        tokio::spawn(async move { engine.transition(&id, submit_faf(), &intake).await })
    };

    // The FAF document and the state change are staged and the row lock is held
    store.stalled.notified().await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    assert_eq!(store.read_protocol(&protocol.id).await.unwrap(), protocol);
    assert_eq!(store.list_documents(&protocol.id).await.unwrap(), documents_before);
    assert_nothing_notified(&notifications).unwrap();

    // The dropped transaction released its lock
    let started = engine
        .transition(&protocol.id, submit_faf(), &cast.intake)
        .await
        .unwrap();
    assert_eq!(started.status, ProtocolStatus::ParallelExecution);
}
