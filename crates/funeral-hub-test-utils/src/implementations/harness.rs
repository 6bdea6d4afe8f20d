use std::sync::Arc;

use funeral_hub_core::{
    Action, Actor, CoreError, EngineConfig, Housekeeping, HousekeepingConfig, Protocol,
    ProtocolId, ProtocolService, WorkflowEngine,
};
use funeral_hub_state_inmemory::{InMemoryProtocolStore, InMemoryUserDirectory};
use tracing::debug;

use super::RecordingNotificationDispatcher;
use crate::builders::{NewProtocolBuilder, TestCast};
use crate::data_generators::{burial_performed, certificate_draft, faf_form, final_certificate};

/// Points along the happy path a protocol can be driven to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Milestone {
    AwaitingValidation,
    AwaitingAttendance,
    AwaitingFafSignatures,
    /// Parallel execution started, documentation awaiting the draft
    AwaitingDraft,
    AwaitingDeclarantApproval,
    AwaitingCertificateIssuance,
    AwaitingCertificatePickup,
    /// Documentation done, burial still in progress
    DocumentationDone,
    Finalized,
}

impl Milestone {
    pub const ALL: [Milestone; 9] = [
        Milestone::AwaitingValidation,
        Milestone::AwaitingAttendance,
        Milestone::AwaitingFafSignatures,
        Milestone::AwaitingDraft,
        Milestone::AwaitingDeclarantApproval,
        Milestone::AwaitingCertificateIssuance,
        Milestone::AwaitingCertificatePickup,
        Milestone::DocumentationDone,
        Milestone::Finalized,
    ];

    /// Action (and who performs it) that reaches this milestone from the previous one
    fn step(&self, cast: &TestCast) -> Option<(Action, Actor)> {
        let step = match self {
            Milestone::AwaitingValidation => return None,
            Milestone::AwaitingAttendance => (Action::ConfirmValidation, cast.intake),
            Milestone::AwaitingFafSignatures => (
                Action::DesignateStakeholders {
                    funeral_home_id: Some(cast.funeral_home.id),
                    notary_id: Some(cast.notary.id),
                    declarant_id: Some(cast.declarant.id),
                },
                cast.intake,
            ),
            Milestone::AwaitingDraft => (
                Action::SubmitFaf {
                    file: Some(faf_form()),
                },
                cast.intake,
            ),
            Milestone::AwaitingDeclarantApproval => (
                Action::SubmitDraft {
                    file: Some(certificate_draft()),
                },
                cast.notary,
            ),
            Milestone::AwaitingCertificateIssuance => (Action::AcceptDraft, cast.declarant),
            Milestone::AwaitingCertificatePickup => (
                Action::SetPickupPrediction {
                    predicted_for: Some("2031-01-15".to_string()),
                },
                cast.notary,
            ),
            Milestone::DocumentationDone => (
                Action::AttachFinalCertificate {
                    file: Some(final_certificate()),
                },
                cast.notary,
            ),
            Milestone::Finalized => (
                Action::UpdateBurialProgress {
                    fields: burial_performed(),
                },
                cast.funeral_home,
            ),
        };
        Some(step)
    }
}

/// Engine, service and in-memory collaborators wired together
pub struct TestHarness {
    pub store: InMemoryProtocolStore,
    pub users: InMemoryUserDirectory,
    pub notifications: RecordingNotificationDispatcher,
    pub engine: Arc<WorkflowEngine>,
    pub service: ProtocolService,
    pub cast: TestCast,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(InMemoryProtocolStore::new(), EngineConfig::default()).await
    }

    /// Harness over `store` with the default cast registered as users
    pub async fn with_config(store: InMemoryProtocolStore, config: EngineConfig) -> Self {
        let notifications = RecordingNotificationDispatcher::new();
        let engine = Arc::new(WorkflowEngine::new(
            Arc::new(store.clone()),
            Arc::new(notifications.clone()),
            config,
        ));
        let users = InMemoryUserDirectory::new();
        let cast = TestCast::default();
        for actor in cast.all() {
            users.add_user(actor).await;
        }
        let service = ProtocolService::new(Arc::new(users.clone()), engine.clone());

        Self {
            store,
            users,
            notifications,
            engine,
            service,
            cast,
        }
    }

    /// Housekeeping over the harness store, revoking through the user directory
    pub fn housekeeping(&self, config: HousekeepingConfig) -> Housekeeping {
        Housekeeping::new(
            Arc::new(self.store.clone()),
            Arc::new(self.notifications.clone()),
            Arc::new(self.users.clone()),
            config,
        )
    }

    /// Create a protocol through intake with the default request
    pub async fn create(&self) -> Result<Protocol, CoreError> {
        self.engine
            .create_protocol(&self.cast.intake, NewProtocolBuilder::new().build())
            .await
    }

    /// Create a protocol and walk it along the happy path up to `milestone`
    pub async fn drive_to(&self, milestone: Milestone) -> Result<Protocol, CoreError> {
        self.drive_as(&self.cast, milestone).await
    }

    /// Like [`drive_to`](Self::drive_to), with `cast` playing every part.
    ///
    /// The cast's users are registered with the directory first.
    pub async fn drive_as(&self, cast: &TestCast, milestone: Milestone) -> Result<Protocol, CoreError> {
        for actor in cast.all() {
            self.users.add_user(actor).await;
        }
        let protocol = self
            .engine
            .create_protocol(&cast.intake, NewProtocolBuilder::new().build())
            .await?;
        self.advance_as(cast, &protocol.id, Milestone::AwaitingValidation, milestone)
            .await
            .map(|advanced| advanced.unwrap_or(protocol))
    }

    /// Apply every step after `from` up to and including `to`
    pub async fn advance(
        &self,
        id: &ProtocolId,
        from: Milestone,
        to: Milestone,
    ) -> Result<Option<Protocol>, CoreError> {
        self.advance_as(&self.cast, id, from, to).await
    }

    async fn advance_as(
        &self,
        cast: &TestCast,
        id: &ProtocolId,
        from: Milestone,
        to: Milestone,
    ) -> Result<Option<Protocol>, CoreError> {
        let mut last = None;
        for milestone in Milestone::ALL.iter().filter(|m| **m > from && **m <= to) {
            if let Some((action, actor)) = milestone.step(cast) {
                debug!(protocol_id = %id, ?milestone, "Driving protocol");
                last = Some(self.engine.transition(id, action, &actor).await?);
            }
        }
        Ok(last)
    }

    /// Committed state of a protocol
    pub async fn read(&self, id: &ProtocolId) -> Result<Protocol, CoreError> {
        self.engine.store().read_protocol(id).await
    }

    /// Reject the pending draft on behalf of the declarant
    pub async fn reject_draft(&self, id: &ProtocolId, remarks: &str) -> Result<Protocol, CoreError> {
        self.engine
            .transition(
                id,
                Action::RejectDraft {
                    remarks: Some(remarks.to_string()),
                },
                &self.cast.declarant,
            )
            .await
    }

    /// Submit a new draft on behalf of the notary
    pub async fn submit_draft(&self, id: &ProtocolId) -> Result<Protocol, CoreError> {
        self.engine
            .transition(
                id,
                Action::SubmitDraft {
                    file: Some(certificate_draft()),
                },
                &self.cast.notary,
            )
            .await
    }
}
