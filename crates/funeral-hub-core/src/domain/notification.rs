//! Notification events and dispatchers
//!
//! Notifications are produced by transitions and housekeeping and handed to a
//! [`NotificationDispatcher`] only after the producing transaction committed.
//! Delivery is best-effort: a failed dispatch is logged and never retried.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::actor::{GroupId, UserId};
use crate::CoreError;

/// Name of the channel that reaches every administrator
pub const ADMINISTRATORS_CHANNEL: &str = "administrators";

/// Recipient of a notification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTarget {
    User(UserId),
    Channel(String),
}

impl NotificationTarget {
    pub fn group(group_id: GroupId) -> Self {
        NotificationTarget::Channel(format!("group_{}", group_id))
    }

    pub fn administrators() -> Self {
        NotificationTarget::Channel(ADMINISTRATORS_CHANNEL.to_string())
    }
}

impl fmt::Display for NotificationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationTarget::User(id) => write!(f, "user_{}", id),
            NotificationTarget::Channel(name) => f.write_str(name),
        }
    }
}

/// Kind of event being announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NewProtocolAwaitingValidation,
    ProtocolCreated,
    StakeholdersDesignated,
    ParallelExecutionStarted,
    BurialProgressUpdated,
    DraftAwaitingApproval,
    DraftAccepted,
    DraftRejected,
    PickupPredictionSet,
    FinalCertificateAttached,
    ProtocolFinalized,
    NotaryInactionAlert,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NewProtocolAwaitingValidation => "new_protocol_awaiting_validation",
            EventKind::ProtocolCreated => "protocol_created",
            EventKind::StakeholdersDesignated => "stakeholders_designated",
            EventKind::ParallelExecutionStarted => "parallel_execution_started",
            EventKind::BurialProgressUpdated => "burial_progress_updated",
            EventKind::DraftAwaitingApproval => "draft_awaiting_approval",
            EventKind::DraftAccepted => "draft_accepted",
            EventKind::DraftRejected => "draft_rejected",
            EventKind::PickupPredictionSet => "pickup_prediction_set",
            EventKind::FinalCertificateAttached => "final_certificate_attached",
            EventKind::ProtocolFinalized => "protocol_finalized",
            EventKind::NotaryInactionAlert => "notary_inaction_alert",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single notification to one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub target: NotificationTarget,
    pub kind: EventKind,
    pub payload: Value,
}

impl Notification {
    pub fn new(target: NotificationTarget, kind: EventKind, payload: Value) -> Self {
        Self {
            target,
            kind,
            payload,
        }
    }
}

/// Delivers notifications; called outside any transaction
pub trait NotificationDispatcher: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), CoreError>;
}

/// Publishes notifications on a tokio broadcast channel.
///
/// Subscribers filter by [`NotificationTarget`], the way socket rooms would.
pub struct BroadcastNotificationDispatcher {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotificationDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl NotificationDispatcher for BroadcastNotificationDispatcher {
    fn notify(&self, notification: Notification) -> Result<(), CoreError> {
        let target = notification.target.to_string();
        let kind = notification.kind;
        match self.sender.send(notification) {
            Ok(receivers) => {
                debug!(%target, %kind, receivers, "Notification published");
                Ok(())
            }
            // Nobody listening is not a failure
            Err(_) => {
                debug!(%target, %kind, "Notification dropped, no subscribers");
                Ok(())
            }
        }
    }
}

/// Writes notifications to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationDispatcher;

impl NotificationDispatcher for TracingNotificationDispatcher {
    fn notify(&self, notification: Notification) -> Result<(), CoreError> {
        info!(
            target_room = %notification.target,
            kind = %notification.kind,
            payload = %notification.payload,
            "Notification"
        );
        Ok(())
    }
}
