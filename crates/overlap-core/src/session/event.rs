//! Typed session events.
//!
//! Cross-component signaling uses explicit typed events over a broadcast
//! channel rather than stringly-keyed notifications: the observer registry
//! publishes incoming snapshots, and the sync service publishes merge
//! results and navigation requests.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::hosted::HostedSession;

/// Events published by the synchronization layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A strictly newer snapshot arrived for an observed remote session.
    /// `session_id` is the remote record ID.
    SnapshotReceived {
        session_id: String,
        hosted: HostedSession,
    },
    /// A local session changed after a successful merge or submission.
    /// `session_id` is the local session ID.
    SessionUpdated { session_id: String },
    /// The local participant was removed from an online session and the
    /// local session was reset. `session_id` is the local session ID.
    ParticipantRemoved { session_id: String },
    /// A joined session is ready to be shown. `session_id` is the local
    /// session ID.
    NavigateToSession { session_id: String },
}

/// Creates the broadcast channel session events are delivered over.
///
/// The sender is handed to the observer registry and sync service at
/// construction time; interested components subscribe for receivers.
pub fn session_event_channel(
    capacity: usize,
) -> (
    broadcast::Sender<SessionEvent>,
    broadcast::Receiver<SessionEvent>,
) {
    broadcast::channel(capacity)
}
