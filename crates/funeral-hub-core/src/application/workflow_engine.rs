use crate::{
    config::EngineConfig,
    domain::action::{Action, NewProtocol},
    domain::actor::Actor,
    domain::finalization,
    domain::notification::{Notification, NotificationDispatcher},
    domain::protocol::{Protocol, ProtocolId},
    domain::repository::{ProtocolStore, ProtocolTransaction},
    domain::transition,
    CoreError,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Central dispatcher for protocol transitions.
///
/// Every call runs as one unit of work: lock the protocol row, evaluate the
/// guards, apply the planned writes, run the finalization check and commit.
/// Notifications go out only after the commit succeeded.
pub struct WorkflowEngine {
    store: Arc<dyn ProtocolStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Create a new workflow engine
    pub fn new(
        store: Arc<dyn ProtocolStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn ProtocolStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a protocol together with its death declaration
    pub async fn create_protocol(
        &self,
        actor: &Actor,
        request: NewProtocol,
    ) -> Result<Protocol, CoreError> {
        let span = info_span!("create_protocol", actor_id = %actor.id);
        async move {
            let plan = transition::plan_creation(actor, request, Utc::now())
                .map_err(|err| self.log_failure(err))?;

            let mut tx = self.store.begin().await.map_err(|err| self.log_failure(err))?;
            let written = async {
                tx.insert_protocol(&plan.protocol).await?;
                for document in &plan.documents {
                    tx.insert_document(document).await?;
                }
                Ok::<(), CoreError>(())
            }
            .await;

            if let Err(err) = written {
                rollback_quietly(tx).await;
                return Err(self.log_failure(err));
            }
            tx.commit().await.map_err(|err| self.log_failure(err))?;

            info!(
                protocol_id = %plan.protocol.id,
                documents = plan.documents.len(),
                "Protocol created"
            );
            self.dispatch(plan.notifications);
            Ok(plan.protocol)
        }
        .instrument(span)
        .await
    }

    /// Apply `action` to the protocol on behalf of `actor`
    pub async fn transition(
        &self,
        id: &ProtocolId,
        action: Action,
        actor: &Actor,
    ) -> Result<Protocol, CoreError> {
        let kind = action.kind();
        let span = info_span!(
            "transition",
            protocol_id = %id,
            action = %kind,
            actor_id = %actor.id
        );
        async move {
            let (protocol, notifications) = self
                .run_transition(id, &action, actor)
                .await
                .map_err(|err| self.log_failure(err))?;

            info!(
                status = %protocol.status,
                burial_status = %protocol.burial_status,
                documentation_status = %protocol.documentation_status,
                "Protocol transitioned"
            );
            self.dispatch(notifications);
            Ok(protocol)
        }
        .instrument(span)
        .await
    }

    /// Like [`transition`](Self::transition), retrying only on contention
    pub async fn transition_with_retry(
        &self,
        id: &ProtocolId,
        action: Action,
        actor: &Actor,
    ) -> Result<Protocol, CoreError> {
        let max_attempts = self.config.retry_max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.transition(id, action.clone(), actor).await {
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let backoff = self.config.retry_backoff(attempt);
                    debug!(protocol_id = %id, attempt, ?backoff, "Retrying contended transition");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn run_transition(
        &self,
        id: &ProtocolId,
        action: &Action,
        actor: &Actor,
    ) -> Result<(Protocol, Vec<Notification>), CoreError> {
        let mut tx = self.store.begin().await?;
        match self.apply_in(tx.as_mut(), id, action, actor).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                rollback_quietly(tx).await;
                Err(err)
            }
        }
    }

    async fn apply_in(
        &self,
        tx: &mut dyn ProtocolTransaction,
        id: &ProtocolId,
        action: &Action,
        actor: &Actor,
    ) -> Result<(Protocol, Vec<Notification>), CoreError> {
        let protocol = tx.lock_protocol(id).await?;
        let command =
            transition::evaluate_guards(&protocol, action, actor, self.config.rejection_cap)?;

        let now = Utc::now();
        let plan = transition::plan(&protocol, command, now);

        if let Some(document) = &plan.document {
            let document = tx.insert_document(document).await?;
            debug!(document_id = %document.id, kind = %document.kind, "Document attached");
        }
        if let Some(patch) = &plan.burial_patch {
            tx.upsert_burial_progress(id, patch).await?;
        }

        let mut updated = tx.apply_mutation(id, &plan.mutation).await?;
        let mut notifications = plan.notifications;

        if let Some(mutation) = finalization::evaluate(&updated, now) {
            updated = tx.apply_mutation(id, &mutation).await?;
            info!("Protocol finalized");
            notifications.extend(finalization::finalization_notifications(&updated));
        }

        Ok((updated, notifications))
    }

    /// Hand notifications to the dispatcher; failures are logged only
    pub(crate) fn dispatch(&self, notifications: Vec<Notification>) {
        dispatch_all(self.dispatcher.as_ref(), notifications);
    }

    fn log_failure(&self, err: CoreError) -> CoreError {
        match &err {
            CoreError::Internal(_) | CoreError::Configuration(_) => {
                error!(error = %err, kind = err.kind(), "Transition failed")
            }
            CoreError::Contention(_) => warn!(error = %err, kind = err.kind(), "Transition contended"),
            _ => info!(error = %err, kind = err.kind(), "Transition rejected"),
        }
        err
    }
}

/// Roll back `tx`, logging instead of returning a failure
pub(crate) async fn rollback_quietly(tx: Box<dyn ProtocolTransaction>) {
    if let Err(err) = tx.rollback().await {
        warn!(error = %err, "Rollback failed");
    }
}

pub(crate) fn dispatch_all(dispatcher: &dyn NotificationDispatcher, notifications: Vec<Notification>) {
    for notification in notifications {
        let target = notification.target.to_string();
        let kind = notification.kind;
        if let Err(err) = dispatcher.notify(notification) {
            warn!(%target, %kind, error = %err, "Notification dispatch failed");
        }
    }
}
