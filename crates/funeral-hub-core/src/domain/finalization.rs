use chrono::{DateTime, Utc};
use serde_json::json;

use super::notification::{EventKind, Notification, NotificationTarget};
use super::protocol::{
    BurialStatus, DocumentationStatus, Protocol, ProtocolMutation, ProtocolStatus,
};

/// Whether both sub-flows are terminal while the protocol runs in parallel
pub fn is_ready_to_finalize(protocol: &Protocol) -> bool {
    protocol.status == ProtocolStatus::ParallelExecution
        && protocol.burial_status == BurialStatus::Done
        && protocol.documentation_status == DocumentationStatus::Done
}

/// Mutation promoting the protocol to `finalized`, or `None` when not ready.
///
/// Idempotent: once finalized the primary state is no longer
/// `parallel_execution`, so a second evaluation yields nothing.
pub fn evaluate(protocol: &Protocol, now: DateTime<Utc>) -> Option<ProtocolMutation> {
    if !is_ready_to_finalize(protocol) {
        return None;
    }
    let mut mutation = ProtocolMutation::touch(now).status(ProtocolStatus::Finalized);
    mutation.finalized_at = Some(now);
    Some(mutation)
}

/// Notifications announcing a finalized protocol
pub fn finalization_notifications(protocol: &Protocol) -> Vec<Notification> {
    let payload = json!({
        "protocol_id": protocol.id.to_string(),
        "message": format!("Protocol #{} has been finalized.", protocol.id.short()),
    });

    let targets = protocol
        .group_id
        .map(NotificationTarget::group)
        .into_iter()
        .chain(protocol.declarant_id.map(NotificationTarget::User));

    targets
        .map(|target| Notification::new(target, EventKind::ProtocolFinalized, payload.clone()))
        .collect()
}
