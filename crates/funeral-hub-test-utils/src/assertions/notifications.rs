//! Assertion utilities for dispatched notifications.

use funeral_hub_core::{EventKind, NotificationTarget};
use thiserror::Error;

use crate::implementations::RecordingNotificationDispatcher;

#[derive(Debug, Error)]
pub enum NotificationAssertionError {
    #[error("No {kind} notification for {target}; recorded: {recorded}")]
    Missing {
        kind: EventKind,
        target: NotificationTarget,
        recorded: String,
    },

    #[error("Expected no notifications, but {0} were recorded: {1}")]
    Unexpected(usize, String),
}

fn describe(recorder: &RecordingNotificationDispatcher) -> String {
    recorder
        .all()
        .iter()
        .map(|n| format!("{}->{}", n.kind, n.target))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Asserts that `target` received at least one notification of `kind`
pub fn assert_notified(
    recorder: &RecordingNotificationDispatcher,
    target: &NotificationTarget,
    kind: EventKind,
) -> Result<(), NotificationAssertionError> {
    if recorder.for_target(target).iter().any(|n| n.kind == kind) {
        return Ok(());
    }
    Err(NotificationAssertionError::Missing {
        kind,
        target: target.clone(),
        recorded: describe(recorder),
    })
}

pub fn assert_nothing_notified(
    recorder: &RecordingNotificationDispatcher,
) -> Result<(), NotificationAssertionError> {
    match recorder.len() {
        0 => Ok(()),
        n => Err(NotificationAssertionError::Unexpected(n, describe(recorder))),
    }
}
