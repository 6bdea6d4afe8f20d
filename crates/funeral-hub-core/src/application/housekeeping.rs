//! Periodic housekeeping jobs
//!
//! Closes finalized protocols, alerts administrators about idle notaries,
//! purges documents of closed protocols and revokes declarant access. Each
//! job runs independently; one failing job never stops the others.

use crate::{
    application::workflow_engine::{dispatch_all, rollback_quietly},
    config::HousekeepingConfig,
    domain::actor::UserId,
    domain::identity::AccessRevoker,
    domain::notification::{EventKind, Notification, NotificationDispatcher, NotificationTarget},
    domain::protocol::{DocumentationStatus, Protocol, ProtocolId, ProtocolMutation, ProtocolStatus},
    domain::repository::{ProtocolQuery, ProtocolStore, ProtocolTransaction, QueryOrder},
    CoreError,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Outcome of one housekeeping run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HousekeepingReport {
    pub closed: usize,
    pub alerts: usize,
    pub purged: usize,
    pub revoked: usize,
    /// Jobs (or single protocols) that failed, with the reason
    pub failures: Vec<String>,
}

/// Housekeeping jobs over the protocol store
pub struct Housekeeping {
    store: Arc<dyn ProtocolStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    revoker: Arc<dyn AccessRevoker>,
    config: HousekeepingConfig,
}

impl Housekeeping {
    pub fn new(
        store: Arc<dyn ProtocolStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        revoker: Arc<dyn AccessRevoker>,
        config: HousekeepingConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            revoker,
            config,
        }
    }

    pub fn config(&self) -> &HousekeepingConfig {
        &self.config
    }

    /// Run every job once against `now`
    pub async fn run_once(&self, now: DateTime<Utc>) -> HousekeepingReport {
        let mut report = HousekeepingReport::default();

        match self.close_finalized(now, &mut report.failures).await {
            Ok(count) => report.closed = count,
            Err(err) => record_job_failure(&mut report.failures, "close_finalized", err),
        }
        match self.alert_notary_inaction(now).await {
            Ok(count) => report.alerts = count,
            Err(err) => record_job_failure(&mut report.failures, "notary_inaction_alert", err),
        }
        match self.purge_documents(now, &mut report.failures).await {
            Ok(count) => report.purged = count,
            Err(err) => record_job_failure(&mut report.failures, "purge_documents", err),
        }
        match self.revoke_declarant_access(now, &mut report.failures).await {
            Ok(count) => report.revoked = count,
            Err(err) => record_job_failure(&mut report.failures, "revoke_declarant_access", err),
        }

        info!(
            closed = report.closed,
            alerts = report.alerts,
            purged = report.purged,
            revoked = report.revoked,
            failures = report.failures.len(),
            "Housekeeping run completed"
        );
        report
    }

    /// Close finalized protocols past the grace period
    pub async fn close_finalized(
        &self,
        now: DateTime<Utc>,
        failures: &mut Vec<String>,
    ) -> Result<usize, CoreError> {
        let cutoff = now - self.config.close_after();
        let candidates = self
            .store
            .list_protocols(&ProtocolQuery {
                finalized_before: Some(cutoff),
                limit: Some(self.config.batch_size),
                ..ProtocolQuery::with_status(ProtocolStatus::Finalized)
            })
            .await?;

        let mut closed = 0;
        for candidate in candidates {
            match self.close_one(&candidate.id, cutoff, now).await {
                Ok(true) => closed += 1,
                Ok(false) => debug!(protocol_id = %candidate.id, "Protocol no longer eligible for closing"),
                Err(err) => record_protocol_failure(failures, "close_finalized", &candidate.id, err),
            }
        }
        Ok(closed)
    }

    async fn close_one(
        &self,
        id: &ProtocolId,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let protocol = tx.lock_protocol(id).await?;
            let eligible = protocol.status == ProtocolStatus::Finalized
                && protocol.finalized_at.map_or(false, |at| at < cutoff);
            if !eligible {
                return Ok(false);
            }

            let mut mutation = ProtocolMutation::touch(now).status(ProtocolStatus::Closed);
            mutation.closed_at = Some(now);
            tx.apply_mutation(id, &mutation).await?;
            Ok::<_, CoreError>(true)
        }
        .await;

        let closed = finish(tx, result, |closed| *closed).await?;
        if closed {
            info!(protocol_id = %id, "Protocol closed");
        }
        Ok(closed)
    }

    /// Alert administrators about documentation idle on the notary's side.
    ///
    /// The longest idle protocols come first, so a capped batch never hides
    /// the most overdue ones.
    pub async fn alert_notary_inaction(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let idle = self
            .store
            .list_protocols(&ProtocolQuery {
                documentation_statuses: vec![
                    DocumentationStatus::AwaitingCorrection,
                    DocumentationStatus::AwaitingCertificateIssuance,
                ],
                updated_before: Some(now - self.config.notary_inaction_after()),
                order: QueryOrder::OldestUpdated,
                limit: Some(self.config.batch_size),
                ..ProtocolQuery::with_status(ProtocolStatus::ParallelExecution)
            })
            .await?;

        let alerts: Vec<Notification> = idle.iter().map(inaction_alert).collect();
        let count = alerts.len();
        if count > 0 {
            warn!(count, "Notary inaction detected");
        }
        dispatch_all(self.dispatcher.as_ref(), alerts);
        Ok(count)
    }

    /// Delete the documents of protocols closed past the retention period
    pub async fn purge_documents(
        &self,
        now: DateTime<Utc>,
        failures: &mut Vec<String>,
    ) -> Result<usize, CoreError> {
        let cutoff = now - self.config.purge_after();
        let candidates = self
            .store
            .list_protocols(&ProtocolQuery {
                closed_before: Some(cutoff),
                not_purged: true,
                order: QueryOrder::OldestClosed,
                limit: Some(self.config.batch_size),
                ..ProtocolQuery::with_status(ProtocolStatus::Closed)
            })
            .await?;

        let mut purged = 0;
        for candidate in candidates {
            match self.purge_one(&candidate.id, now).await {
                Ok(Some(documents)) => {
                    info!(protocol_id = %candidate.id, documents, "Protocol documents purged");
                    purged += 1;
                }
                Ok(None) => debug!(protocol_id = %candidate.id, "Protocol already purged"),
                Err(err) => record_protocol_failure(failures, "purge_documents", &candidate.id, err),
            }
        }
        Ok(purged)
    }

    async fn purge_one(&self, id: &ProtocolId, now: DateTime<Utc>) -> Result<Option<u64>, CoreError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let protocol = tx.lock_protocol(id).await?;
            if protocol.status != ProtocolStatus::Closed || protocol.documents_purged_at.is_some() {
                return Ok(None);
            }
            let removed = tx.purge_documents(id).await?;
            let mut mutation = ProtocolMutation::touch(now);
            mutation.documents_purged_at = Some(now);
            tx.apply_mutation(id, &mutation).await?;
            Ok::<_, CoreError>(Some(removed))
        }
        .await;

        finish(tx, result, Option::is_some).await
    }

    /// Revoke the access of declarants whose protocols closed long ago.
    ///
    /// Each handled protocol is stamped, so it leaves the candidate set and
    /// the next batch reaches the protocols behind it.
    pub async fn revoke_declarant_access(
        &self,
        now: DateTime<Utc>,
        failures: &mut Vec<String>,
    ) -> Result<usize, CoreError> {
        let cutoff = now - self.config.revoke_after();
        let candidates = self
            .store
            .list_protocols(&ProtocolQuery {
                closed_before: Some(cutoff),
                declarant_not_revoked: true,
                order: QueryOrder::OldestClosed,
                limit: Some(self.config.batch_size),
                ..ProtocolQuery::with_status(ProtocolStatus::Closed)
            })
            .await?;

        let mut revoked = 0;
        for candidate in candidates {
            match self.revoke_one(&candidate.id, cutoff, now).await {
                Ok(Some(declarant)) => {
                    info!(protocol_id = %candidate.id, user_id = %declarant, "Declarant access revoked");
                    revoked += 1;
                }
                Ok(None) => debug!(protocol_id = %candidate.id, "Declarant access already handled"),
                Err(err) => {
                    record_protocol_failure(failures, "revoke_declarant_access", &candidate.id, err)
                }
            }
        }
        Ok(revoked)
    }

    /// Revoke one protocol's declarant and stamp the protocol.
    ///
    /// Returns the declarant when this call revoked an active access; a
    /// declarant already revoked elsewhere is stamped but not counted.
    async fn revoke_one(
        &self,
        id: &ProtocolId,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, CoreError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let protocol = tx.lock_protocol(id).await?;
            let eligible = protocol.status == ProtocolStatus::Closed
                && protocol.closed_at.map_or(false, |at| at < cutoff)
                && protocol.declarant_access_revoked_at.is_none();
            let declarant = match protocol.declarant_id {
                Some(declarant) if eligible => declarant,
                _ => return Ok(None),
            };

            let newly_revoked = self.revoker.revoke_access(declarant).await?;
            let mut mutation = ProtocolMutation::touch(now);
            mutation.declarant_access_revoked_at = Some(now);
            tx.apply_mutation(id, &mutation).await?;
            Ok::<_, CoreError>(newly_revoked.then_some(declarant))
        }
        .await;

        finish(tx, result, |_| true).await
    }
}

/// Commit when `result` is `Ok` and `wrote` says something was written,
/// roll back otherwise
async fn finish<T>(
    tx: Box<dyn ProtocolTransaction>,
    result: Result<T, CoreError>,
    wrote: impl FnOnce(&T) -> bool,
) -> Result<T, CoreError> {
    match result {
        Ok(value) if wrote(&value) => {
            tx.commit().await?;
            Ok(value)
        }
        Ok(value) => {
            rollback_quietly(tx).await;
            Ok(value)
        }
        Err(err) => {
            rollback_quietly(tx).await;
            Err(err)
        }
    }
}

fn inaction_alert(protocol: &Protocol) -> Notification {
    Notification::new(
        NotificationTarget::administrators(),
        EventKind::NotaryInactionAlert,
        json!({
            "protocol_id": protocol.id.to_string(),
            "documentation_status": protocol.documentation_status,
            "notary_id": protocol.notary_id,
            "idle_since": protocol.updated_at,
            "message": format!(
                "Protocol #{} has been waiting on the notary since {}.",
                protocol.id.short(),
                protocol.updated_at.format("%Y-%m-%d %H:%M")
            ),
        }),
    )
}

fn record_job_failure(failures: &mut Vec<String>, job: &str, err: CoreError) {
    error!(job, error = %err, "Housekeeping job failed");
    failures.push(format!("{}: {}", job, err));
}

fn record_protocol_failure(failures: &mut Vec<String>, job: &str, id: &ProtocolId, err: CoreError) {
    warn!(job, protocol_id = %id, error = %err, "Housekeeping step failed");
    failures.push(format!("{} {}: {}", job, id, err));
}

/// Runs [`Housekeeping::run_once`] on a fixed interval until shut down
pub struct HousekeepingScheduler {
    housekeeping: Arc<Housekeeping>,
    interval: std::time::Duration,
}

impl HousekeepingScheduler {
    pub fn new(housekeeping: Arc<Housekeeping>) -> Self {
        let interval = housekeeping.config().interval();
        Self {
            housekeeping,
            interval,
        }
    }

    pub fn with_interval(mut self, interval: std::time::Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Loop until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The first run happens immediately.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval = ?self.interval, "Housekeeping scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.housekeeping.run_once(Utc::now()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Housekeeping scheduler stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
