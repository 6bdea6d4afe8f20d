//! Housekeeping jobs over protocols driven through the engine.

use chrono::{Duration, Utc};
use funeral_hub_core::{
    DocumentationStatus, EventKind, HousekeepingConfig, NotificationTarget, ProtocolStatus,
    ProtocolStore,
};
use funeral_hub_test_utils::assertions::assert_notified;
use funeral_hub_test_utils::{Milestone, TestCast, TestHarness};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_finalized_protocol_closes_after_grace_period() {
    let harness = TestHarness::new().await;
    let protocol = harness.drive_to(Milestone::Finalized).await.unwrap();
    let housekeeping = harness.housekeeping(HousekeepingConfig::default());

    let early = housekeeping.run_once(Utc::now() + Duration::hours(71)).await;
    assert_eq!(early.closed, 0);
    assert_eq!(harness.read(&protocol.id).await.unwrap().status, ProtocolStatus::Finalized);

    let report = housekeeping.run_once(Utc::now() + Duration::hours(73)).await;
    assert_eq!(report.closed, 1);
    assert!(report.failures.is_empty(), "{:?}", report.failures);

    let closed = harness.read(&protocol.id).await.unwrap();
    assert_eq!(closed.status, ProtocolStatus::Closed);
    assert!(closed.closed_at.is_some());
    assert!(closed.documents_purged_at.is_none());
}

#[tokio::test]
async fn test_closed_protocol_documents_are_purged() {
    let harness = TestHarness::new().await;
    let protocol = harness.drive_to(Milestone::Finalized).await.unwrap();
    let housekeeping = harness.housekeeping(HousekeepingConfig::default());
    let store = harness.engine.store();
    assert!(!store.list_documents(&protocol.id).await.unwrap().is_empty());

    let closing_time = Utc::now() + Duration::hours(73);
    housekeeping.run_once(closing_time).await;

    let report = housekeeping.run_once(closing_time + Duration::hours(73)).await;
    assert_eq!(report.purged, 1);
    assert!(store.list_documents(&protocol.id).await.unwrap().is_empty());

    let purged = harness.read(&protocol.id).await.unwrap();
    assert!(purged.documents_purged_at.is_some());

    let again = housekeeping.run_once(closing_time + Duration::hours(80)).await;
    assert_eq!(again.purged, 0);
}

#[tokio::test]
async fn test_declarant_access_revoked_a_month_after_closing() {
    let harness = TestHarness::new().await;
    harness.drive_to(Milestone::Finalized).await.unwrap();
    let housekeeping = harness.housekeeping(HousekeepingConfig::default());
    let declarant = harness.cast.declarant.id;

    let closing_time = Utc::now() + Duration::hours(73);
    housekeeping.run_once(closing_time).await;
    assert!(!harness.users.is_revoked(declarant).await);

    let report = housekeeping.run_once(closing_time + Duration::days(31)).await;
    assert_eq!(report.revoked, 1);
    assert!(harness.users.is_revoked(declarant).await);

    let err = harness
        .service
        .get(&declarant.to_string(), &harness.create().await.unwrap().id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "unauthenticated");

    let again = housekeeping.run_once(closing_time + Duration::days(32)).await;
    assert_eq!(again.revoked, 0);
}

#[tokio::test]
async fn test_revocation_batches_work_through_every_declarant() {
    let harness = TestHarness::new().await;
    let casts: Vec<TestCast> = [100, 200, 300].into_iter().map(TestCast::with_offset).collect();
    for cast in &casts {
        harness.drive_as(cast, Milestone::Finalized).await.unwrap();
    }
    let housekeeping = harness.housekeeping(HousekeepingConfig {
        batch_size: 2,
        ..HousekeepingConfig::default()
    });

    let closing_time = Utc::now() + Duration::hours(73);
    assert_eq!(housekeeping.run_once(closing_time).await.closed, 3);

    let mut revoked = Vec::new();
    for day in 31..36 {
        let report = housekeeping.run_once(closing_time + Duration::days(day)).await;
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        revoked.push(report.revoked);
    }
    assert_eq!(revoked, vec![2, 1, 0, 0, 0]);

    for cast in &casts {
        assert!(
            harness.users.is_revoked(cast.declarant.id).await,
            "declarant {} kept access",
            cast.declarant.id
        );
    }
    assert!(!harness.users.is_revoked(harness.cast.declarant.id).await);
}

#[tokio::test]
async fn test_idle_notary_raises_administrator_alert() {
    let harness = TestHarness::new().await;
    let issuing = harness
        .drive_to(Milestone::AwaitingCertificateIssuance)
        .await
        .unwrap();
    let correcting = harness
        .drive_to(Milestone::AwaitingDeclarantApproval)
        .await
        .unwrap();
    harness
        .reject_draft(&correcting.id, "wrong date of death")
        .await
        .unwrap();
    let waiting_on_declarant = harness
        .drive_to(Milestone::AwaitingDeclarantApproval)
        .await
        .unwrap();
    assert_eq!(
        waiting_on_declarant.documentation_status,
        DocumentationStatus::AwaitingDeclarantApproval
    );
    harness.notifications.clear();

    let housekeeping = harness.housekeeping(HousekeepingConfig::default());
    let quiet = housekeeping.run_once(Utc::now() + Duration::hours(95)).await;
    assert_eq!(quiet.alerts, 0);

    let report = housekeeping.run_once(Utc::now() + Duration::hours(97)).await;
    assert_eq!(report.alerts, 2);

    let alerts = harness.notifications.of_kind(EventKind::NotaryInactionAlert);
    let mut alerted: Vec<String> = alerts
        .iter()
        .map(|alert| alert.payload["protocol_id"].as_str().unwrap_or_default().to_string())
        .collect();
    alerted.sort();
    let mut expected = vec![issuing.id.to_string(), correcting.id.to_string()];
    expected.sort();
    assert_eq!(alerted, expected);

    assert_notified(
        &harness.notifications,
        &NotificationTarget::administrators(),
        EventKind::NotaryInactionAlert,
    )
    .unwrap();
}

#[tokio::test]
async fn test_open_protocols_are_left_alone() {
    let harness = TestHarness::new().await;
    let protocol = harness.drive_to(Milestone::DocumentationDone).await.unwrap();
    let housekeeping = harness.housekeeping(HousekeepingConfig::default());

    let report = housekeeping.run_once(Utc::now() + Duration::days(60)).await;
    assert_eq!(report.closed, 0);
    assert_eq!(report.purged, 0);
    assert_eq!(report.revoked, 0);

    let untouched = harness.read(&protocol.id).await.unwrap();
    assert_eq!(untouched.status, ProtocolStatus::ParallelExecution);
    assert!(!harness.users.is_revoked(harness.cast.declarant.id).await);
}

#[tokio::test]
async fn test_longest_idle_protocol_is_alerted_first() {
    let harness = TestHarness::new().await;
    let longest_idle = harness
        .drive_to(Milestone::AwaitingCertificateIssuance)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let recently_idle = harness
        .drive_to(Milestone::AwaitingCertificateIssuance)
        .await
        .unwrap();
    assert!(longest_idle.updated_at < recently_idle.updated_at);
    harness.notifications.clear();

    let housekeeping = harness.housekeeping(HousekeepingConfig {
        batch_size: 1,
        ..HousekeepingConfig::default()
    });
    let report = housekeeping.run_once(Utc::now() + Duration::hours(97)).await;
    assert_eq!(report.alerts, 1);

    let alerts = harness.notifications.of_kind(EventKind::NotaryInactionAlert);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].payload["protocol_id"], longest_idle.id.to_string());
}
