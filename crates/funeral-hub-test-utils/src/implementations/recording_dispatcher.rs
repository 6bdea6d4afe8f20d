use funeral_hub_core::{CoreError, EventKind, Notification, NotificationDispatcher, NotificationTarget};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Thread-safe dispatcher that keeps every notification for inspection
#[derive(Clone, Default)]
pub struct RecordingNotificationDispatcher {
    sent: Arc<RwLock<Vec<Notification>>>,
}

impl fmt::Debug for RecordingNotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingNotificationDispatcher")
            .field("sent", &self.sent.read().len())
            .finish()
    }
}

impl RecordingNotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.sent.read().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.sent.read().iter().map(|n| n.kind).collect()
    }

    pub fn for_target(&self, target: &NotificationTarget) -> Vec<Notification> {
        self.sent
            .read()
            .iter()
            .filter(|n| &n.target == target)
            .cloned()
            .collect()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<Notification> {
        self.sent
            .read()
            .iter()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sent.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.read().is_empty()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.sent.write().clear();
    }
}

impl NotificationDispatcher for RecordingNotificationDispatcher {
    fn notify(&self, notification: Notification) -> Result<(), CoreError> {
        self.sent.write().push(notification);
        Ok(())
    }
}
