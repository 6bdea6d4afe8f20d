//! Token-facing service over the in-memory store and user directory.

use funeral_hub_core::{
    Action, DocumentKind, DocumentationStatus, ProtocolId, ProtocolQuery, ProtocolStatus,
};
use funeral_hub_test_utils::data_generators::burial_fields;
use funeral_hub_test_utils::{Milestone, NewProtocolBuilder, TestCast, TestHarness};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_create_and_transition_by_token() {
    let harness = TestHarness::new().await;
    let intake = TestCast::token(&harness.cast.intake);

    let created = harness
        .service
        .create(&intake, NewProtocolBuilder::new().build())
        .await
        .unwrap();
    assert_eq!(created.status, ProtocolStatus::AwaitingValidation);
    assert_eq!(created.group_id, Some(harness.cast.group));

    let validated = harness
        .service
        .transition(&intake, &created.id, Action::ConfirmValidation)
        .await
        .unwrap();
    assert_eq!(validated.status, ProtocolStatus::AwaitingAttendance);
}

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let harness = TestHarness::new().await;
    let protocol = harness.create().await.unwrap();

    for token in ["", "not-a-user", "424242"] {
        let err = harness.service.get(token, &protocol.id).await.unwrap_err();
        assert_eq!(err.kind(), "unauthenticated", "token {:?}", token);
    }

    let err = harness
        .service
        .transition("424242", &protocol.id, Action::ConfirmValidation)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "unauthenticated");
    assert_eq!(
        harness.read(&protocol.id).await.unwrap().status,
        ProtocolStatus::AwaitingValidation
    );
}

#[tokio::test]
async fn test_reads_documents_and_burial_progress() {
    let harness = TestHarness::new().await;
    let protocol = harness.drive_to(Milestone::AwaitingDraft).await.unwrap();
    let funeral_home = TestCast::token(&harness.cast.funeral_home);

    let fetched = harness.service.get(&funeral_home, &protocol.id).await.unwrap();
    assert_eq!(fetched, protocol);

    let kinds: Vec<DocumentKind> = harness
        .service
        .documents(&funeral_home, &protocol.id)
        .await
        .unwrap()
        .into_iter()
        .map(|document| document.kind)
        .collect();
    assert_eq!(kinds, vec![DocumentKind::DeathDeclaration, DocumentKind::Faf]);

    assert!(harness
        .service
        .burial_progress(&funeral_home, &protocol.id)
        .await
        .unwrap()
        .is_none());

    harness
        .service
        .transition(
            &funeral_home,
            &protocol.id,
            Action::UpdateBurialProgress {
                fields: burial_fields(json!({ "body_removed": true })),
            },
        )
        .await
        .unwrap();
    let progress = harness
        .service
        .burial_progress(&funeral_home, &protocol.id)
        .await
        .unwrap()
        .expect("burial progress should be recorded");
    assert!(progress.body_removed);
}

#[tokio::test]
async fn test_unknown_protocol_is_not_found() {
    let harness = TestHarness::new().await;
    let token = TestCast::token(&harness.cast.admin);
    let missing = ProtocolId::new();

    assert_eq!(
        harness.service.get(&token, &missing).await.unwrap_err().kind(),
        "not_found"
    );
    assert_eq!(
        harness.service.documents(&token, &missing).await.unwrap_err().kind(),
        "not_found"
    );
    assert_eq!(
        harness
            .service
            .burial_progress(&token, &missing)
            .await
            .unwrap_err()
            .kind(),
        "not_found"
    );
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let harness = TestHarness::new().await;
    let fresh = harness.create().await.unwrap();
    let drafting = harness.drive_to(Milestone::AwaitingDraft).await.unwrap();
    let approving = harness
        .drive_to(Milestone::AwaitingDeclarantApproval)
        .await
        .unwrap();
    let token = TestCast::token(&harness.cast.admin);

    let all = harness
        .service
        .list(&token, &ProtocolQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let awaiting = harness
        .service
        .list(&token, &ProtocolQuery::with_status(ProtocolStatus::AwaitingValidation))
        .await
        .unwrap();
    assert_eq!(awaiting.len(), 1);
    assert_eq!(awaiting[0].id, fresh.id);

    let drafts = harness
        .service
        .list(
            &token,
            &ProtocolQuery {
                documentation_statuses: vec![DocumentationStatus::AwaitingDraft],
                ..ProtocolQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, drafting.id);

    let limited = harness
        .service
        .list(
            &token,
            &ProtocolQuery {
                status: Some(ProtocolStatus::ParallelExecution),
                limit: Some(1),
                ..ProtocolQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, approving.id);
}
