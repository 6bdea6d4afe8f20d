//! Step definitions for protocol workflow features

use chrono::{Duration, Utc};
use cucumber::{given, then, when};
use funeral_hub_core::{
    Action, BurialStatus, DocumentationStatus, EngineConfig, EventKind, HousekeepingConfig,
    NotificationTarget, ProtocolStatus,
};
use funeral_hub_state_inmemory::InMemoryProtocolStore;
use serde_json::json;
use tracing::info;

use funeral_hub_test_utils::assertions::{assert_nothing_notified, assert_notified};
use funeral_hub_test_utils::data_generators::{
    burial_performed, certificate_draft, faf_form, final_certificate,
};
use funeral_hub_test_utils::{Milestone, NewProtocolBuilder, TestCast, TestHarness};

use super::world::FuneralHubWorld;

fn milestone(name: &str) -> Milestone {
    match name {
        "awaiting_validation" => Milestone::AwaitingValidation,
        "awaiting_attendance" => Milestone::AwaitingAttendance,
        "awaiting_faf_signatures" => Milestone::AwaitingFafSignatures,
        "awaiting_draft" => Milestone::AwaitingDraft,
        "awaiting_declarant_approval" => Milestone::AwaitingDeclarantApproval,
        "awaiting_certificate_issuance" => Milestone::AwaitingCertificateIssuance,
        "awaiting_certificate_pickup" => Milestone::AwaitingCertificatePickup,
        "documentation_done" => Milestone::DocumentationDone,
        "finalized" => Milestone::Finalized,
        other => panic!("unknown milestone in feature file: {}", other),
    }
}

/// Action named in a feature file, with a valid payload
fn action(name: &str, world: &FuneralHubWorld) -> Action {
    let cast = &world.harness().cast;
    match name {
        "confirm_validation" => Action::ConfirmValidation,
        "designate_stakeholders" => Action::DesignateStakeholders {
            funeral_home_id: Some(cast.funeral_home.id),
            notary_id: Some(cast.notary.id),
            declarant_id: Some(cast.declarant.id),
        },
        "submit_faf" => Action::SubmitFaf {
            file: Some(faf_form()),
        },
        "complete_burial" => Action::UpdateBurialProgress {
            fields: burial_performed(),
        },
        "submit_draft" => Action::SubmitDraft {
            file: Some(certificate_draft()),
        },
        "accept_draft" => Action::AcceptDraft,
        "reject_draft" => Action::RejectDraft {
            remarks: Some("Mother's name is misspelled".to_string()),
        },
        "set_pickup_prediction" => Action::SetPickupPrediction {
            predicted_for: Some("2031-02-01".to_string()),
        },
        "attach_final_certificate" => Action::AttachFinalCertificate {
            file: Some(final_certificate()),
        },
        other => panic!("unknown action in feature file: {}", other),
    }
}

fn event_kind(name: &str) -> EventKind {
    serde_json::from_value(json!(name))
        .unwrap_or_else(|_| panic!("unknown event kind in feature file: {}", name))
}

/// Setup steps

#[given(expr = "a funeral hub")]
pub async fn setup_funeral_hub(world: &mut FuneralHubWorld) {
    world.harness = Some(TestHarness::new().await);
}

#[given(expr = "a funeral hub allowing {int} draft rejection(s)")]
pub async fn setup_funeral_hub_with_cap(world: &mut FuneralHubWorld, cap: u32) {
    let config = EngineConfig {
        rejection_cap: cap,
        ..EngineConfig::default()
    };
    world.harness = Some(TestHarness::with_config(InMemoryProtocolStore::new(), config).await);
}

#[given(expr = "a protocol at {string}")]
pub async fn protocol_at_milestone(world: &mut FuneralHubWorld, name: String) {
    let protocol = world
        .harness()
        .drive_to(milestone(&name))
        .await
        .expect("driving the protocol should succeed");
    info!(protocol_id = %protocol.id, milestone = %name, "Protocol prepared");
    world.protocol = Some(protocol);
    world.harness().notifications.clear();
}

/// Action steps

#[when(expr = "intake opens a protocol")]
pub async fn intake_opens_protocol(world: &mut FuneralHubWorld) {
    let result = world.harness().create().await;
    world.record(result);
}

#[when(expr = "intake opens a protocol without a death declaration")]
pub async fn intake_opens_protocol_without_declaration(world: &mut FuneralHubWorld) {
    let harness = world.harness();
    let result = harness
        .engine
        .create_protocol(
            &harness.cast.intake,
            NewProtocolBuilder::new().without_declaration().build(),
        )
        .await;
    world.record(result);
}

#[when(expr = "the {word} performs {string}")]
pub async fn cast_member_performs(world: &mut FuneralHubWorld, role: String, name: String) {
    let actor = world.actor(&role);
    let action = action(&name, world);
    let id = world.protocol_id();
    let result = world.harness().engine.transition(&id, action, &actor).await;
    world.record(result);
}

#[when(expr = "another {word} performs {string}")]
pub async fn stranger_performs(world: &mut FuneralHubWorld, role: String, name: String) {
    let actor = TestCast::stranger(FuneralHubWorld::role(&role));
    let action = action(&name, world);
    let id = world.protocol_id();
    let result = world.harness().engine.transition(&id, action, &actor).await;
    world.record(result);
}

#[when(expr = "housekeeping runs {int} hours later")]
pub async fn housekeeping_runs(world: &mut FuneralHubWorld, hours: i64) {
    let report = world
        .harness()
        .housekeeping(HousekeepingConfig::default())
        .run_once(Utc::now() + Duration::hours(hours))
        .await;
    world.report = Some(report);
    world.refresh().await;
}

/// Outcome steps

#[then(expr = "the protocol is {string}")]
pub async fn protocol_status_is(world: &mut FuneralHubWorld, expected: String) {
    assert!(world.last_error.is_none(), "unexpected error: {:?}", world.last_error);
    world.refresh().await;
    let expected: ProtocolStatus = expected.parse().expect("known protocol status");
    assert_eq!(world.protocol.as_ref().map(|p| p.status), Some(expected));
}

#[then(expr = "the documentation is {string}")]
pub async fn documentation_status_is(world: &mut FuneralHubWorld, expected: String) {
    world.refresh().await;
    let expected: DocumentationStatus = expected.parse().expect("known documentation status");
    assert_eq!(
        world.protocol.as_ref().map(|p| p.documentation_status),
        Some(expected)
    );
}

#[then(expr = "the burial is {string}")]
pub async fn burial_status_is(world: &mut FuneralHubWorld, expected: String) {
    world.refresh().await;
    let expected: BurialStatus = expected.parse().expect("known burial status");
    assert_eq!(world.protocol.as_ref().map(|p| p.burial_status), Some(expected));
}

#[then(expr = "the draft was rejected {int} time(s)")]
pub async fn draft_rejections_are(world: &mut FuneralHubWorld, expected: u32) {
    world.refresh().await;
    assert_eq!(
        world.protocol.as_ref().map(|p| p.draft_rejection_count),
        Some(expected)
    );
}

#[then(expr = "the action fails with {string}")]
pub async fn action_fails_with(world: &mut FuneralHubWorld, kind: String) {
    let err = world
        .last_error
        .as_ref()
        .expect("the last action should have failed");
    assert_eq!(err.kind(), kind, "unexpected error: {}", err);
}

#[then(expr = "the {word} is notified of {string}")]
pub async fn cast_member_notified(world: &mut FuneralHubWorld, role: String, kind: String) {
    let target = NotificationTarget::User(world.actor(&role).id);
    assert_notified(&world.harness().notifications, &target, event_kind(&kind))
        .unwrap_or_else(|err| panic!("{}", err));
}

#[then(expr = "the intake group is notified of {string}")]
pub async fn group_notified(world: &mut FuneralHubWorld, kind: String) {
    let target = NotificationTarget::group(world.harness().cast.group);
    assert_notified(&world.harness().notifications, &target, event_kind(&kind))
        .unwrap_or_else(|err| panic!("{}", err));
}

#[then(expr = "nobody is notified")]
pub async fn nobody_notified(world: &mut FuneralHubWorld) {
    assert_nothing_notified(&world.harness().notifications)
        .unwrap_or_else(|err| panic!("{}", err));
}

#[then(expr = "housekeeping closed {int} protocol(s)")]
pub async fn housekeeping_closed(world: &mut FuneralHubWorld, expected: usize) {
    let report = world.report.as_ref().expect("housekeeping should have run");
    assert_eq!(report.closed, expected);
    assert!(report.failures.is_empty(), "failures: {:?}", report.failures);
}
