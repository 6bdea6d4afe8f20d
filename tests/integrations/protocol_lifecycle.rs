//! End-to-end protocol walks through the engine over the in-memory store.

use funeral_hub_core::{
    Action, BurialStatus, DocumentKind, DocumentationStatus, EventKind, NotificationTarget,
    ProtocolStatus, ProtocolStore,
};
use funeral_hub_test_utils::assertions::{assert_notified, assert_protocol_state};
use funeral_hub_test_utils::data_generators::{burial_fields, faf_form, final_certificate};
use funeral_hub_test_utils::{Milestone, TestHarness};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_submit_faf_starts_parallel_execution() {
    let harness = TestHarness::new().await;
    let protocol = harness
        .drive_to(Milestone::AwaitingFafSignatures)
        .await
        .unwrap();
    harness.notifications.clear();

    let updated = harness
        .engine
        .transition(
            &protocol.id,
            Action::SubmitFaf {
                file: Some(faf_form()),
            },
            &harness.cast.intake,
        )
        .await
        .unwrap();

    assert_protocol_state(
        &updated,
        ProtocolStatus::ParallelExecution,
        BurialStatus::InProgress,
        DocumentationStatus::AwaitingDraft,
    )
    .unwrap();

    let kinds: Vec<DocumentKind> = harness
        .engine
        .store()
        .list_documents(&protocol.id)
        .await
        .unwrap()
        .into_iter()
        .map(|document| document.kind)
        .collect();
    assert_eq!(kinds, vec![DocumentKind::DeathDeclaration, DocumentKind::Faf]);

    for actor in [
        harness.cast.funeral_home,
        harness.cast.notary,
        harness.cast.declarant,
    ] {
        assert_notified(
            &harness.notifications,
            &NotificationTarget::User(actor.id),
            EventKind::ParallelExecutionStarted,
        )
        .unwrap();
    }
}

#[tokio::test]
async fn test_second_rejection_exceeds_the_limit() {
    let harness = TestHarness::new().await;
    let protocol = harness
        .drive_to(Milestone::AwaitingDeclarantApproval)
        .await
        .unwrap();

    let rejected = harness.reject_draft(&protocol.id, "missing CPF").await.unwrap();
    assert_eq!(
        rejected.documentation_status,
        DocumentationStatus::AwaitingCorrection
    );
    assert_eq!(rejected.draft_rejection_count, 1);
    assert_eq!(rejected.draft_rejection_remarks.as_deref(), Some("missing CPF"));

    let rejection = harness.notifications.of_kind(EventKind::DraftRejected);
    assert_eq!(rejection.len(), 1);
    assert_eq!(rejection[0].target, NotificationTarget::User(harness.cast.notary.id));
    assert_eq!(rejection[0].payload["remarks"], json!("missing CPF"));

    let resubmitted = harness.submit_draft(&protocol.id).await.unwrap();
    assert_eq!(
        resubmitted.documentation_status,
        DocumentationStatus::AwaitingDeclarantApproval
    );

    let err = harness
        .reject_draft(&protocol.id, "still wrong")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "business_limit_exceeded");

    let stored = harness.read(&protocol.id).await.unwrap();
    assert_eq!(
        stored.documentation_status,
        DocumentationStatus::AwaitingDeclarantApproval
    );
    assert_eq!(stored.draft_rejection_count, 1);
    assert_eq!(stored.draft_rejection_remarks.as_deref(), Some("missing CPF"));
}

#[tokio::test]
async fn test_finalization_waits_for_both_sub_flows() {
    let harness = TestHarness::new().await;
    let protocol = harness
        .drive_to(Milestone::AwaitingCertificatePickup)
        .await
        .unwrap();

    let burial_done = harness
        .engine
        .transition(
            &protocol.id,
            Action::UpdateBurialProgress {
                fields: burial_fields(json!({
                    "body_retrieved_at": "2024-03-01T08:30:00Z",
                    "burial_stage": "performed",
                })),
            },
            &harness.cast.funeral_home,
        )
        .await
        .unwrap();
    assert_eq!(burial_done.status, ProtocolStatus::ParallelExecution);
    assert_eq!(burial_done.burial_status, BurialStatus::Done);
    assert!(harness.notifications.of_kind(EventKind::ProtocolFinalized).is_empty());

    let finalized = harness
        .engine
        .transition(
            &protocol.id,
            Action::AttachFinalCertificate {
                file: Some(final_certificate()),
            },
            &harness.cast.notary,
        )
        .await
        .unwrap();
    assert_protocol_state(
        &finalized,
        ProtocolStatus::Finalized,
        BurialStatus::Done,
        DocumentationStatus::Done,
    )
    .unwrap();
    assert!(finalized.finalized_at.is_some());

    assert_notified(
        &harness.notifications,
        &NotificationTarget::group(harness.cast.group),
        EventKind::ProtocolFinalized,
    )
    .unwrap();
    assert_notified(
        &harness.notifications,
        &NotificationTarget::User(harness.cast.declarant.id),
        EventKind::ProtocolFinalized,
    )
    .unwrap();

    let progress = harness
        .engine
        .store()
        .read_burial_progress(&protocol.id)
        .await
        .unwrap()
        .expect("burial progress should be recorded");
    assert!(progress.body_retrieved_at.is_some());
}

#[tokio::test]
async fn test_finalized_protocol_accepts_no_more_actions() {
    let harness = TestHarness::new().await;
    let protocol = harness.drive_to(Milestone::Finalized).await.unwrap();
    assert_eq!(protocol.status, ProtocolStatus::Finalized);

    let err = harness
        .engine
        .transition(
            &protocol.id,
            Action::UpdateBurialProgress {
                fields: burial_fields(json!({ "body_removed": true })),
            },
            &harness.cast.funeral_home,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_transition");
}
