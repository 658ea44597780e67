//! Snapshot applier.
//!
//! Merges a remote `HostedSession` snapshot into a local `Session`. The
//! remote record is authoritative: the roster is replaced verbatim and each
//! participant's answers are overwritten wholesale (last full snapshot
//! wins). Revisions gate the merge so snapshots apply in order, stale ones
//! are dropped silently, and applying the same snapshot twice is a no-op.

use super::hosted::HostedSession;
use super::identity::resolve_participant_id;
use super::model::Session;
use super::state::SessionState;

/// Result of applying a snapshot to a local session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The snapshot was merged. `removed` reports whether the local
    /// device's participant identity is no longer part of the roster.
    Applied { removed: bool },
    /// The snapshot's revision was not newer than the one already applied
    /// (or the snapshot did not belong to this session); nothing changed.
    Stale { revision: u64 },
}

impl SnapshotOutcome {
    /// Whether the merge reported the local participant as removed.
    pub fn removed(&self) -> bool {
        matches!(self, Self::Applied { removed: true })
    }

    /// Whether the snapshot actually mutated the session.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Merges a remote snapshot into the local session.
///
/// Steps, in order:
/// 1. Drop the snapshot if it is not strictly newer than the last applied
///    revision, or if it does not belong to this session.
/// 2. Replace the local roster with the remote roster verbatim.
/// 3. Overwrite every present participant's answers with the remote set;
///    entries for removed participants disappear with the roster.
/// 4. Recompute the state from the merged data, forward only.
/// 5. Report whether the local participant identity is gone from the roster.
pub fn apply_snapshot(hosted: &HostedSession, session: &mut Session) -> SnapshotOutcome {
    let Some(online) = session.online.as_ref() else {
        tracing::debug!(
            target: "session_sync",
            "Snapshot {} ignored: session {} is not online",
            hosted.session_id,
            session.id
        );
        return SnapshotOutcome::Stale {
            revision: hosted.revision,
        };
    };
    if online.session_id != hosted.session_id {
        tracing::debug!(
            target: "session_sync",
            "Snapshot for {} ignored: session {} is backed by {}",
            hosted.session_id,
            session.id,
            online.session_id
        );
        return SnapshotOutcome::Stale {
            revision: hosted.revision,
        };
    }
    if let Some(applied) = online.applied_revision {
        if hosted.revision <= applied {
            tracing::debug!(
                target: "session_sync",
                "Stale snapshot ignored for session {} (revision {} <= {})",
                hosted.session_id,
                hosted.revision,
                applied
            );
            return SnapshotOutcome::Stale {
                revision: hosted.revision,
            };
        }
    }

    // Resolve (and cache) the local identity against the incoming roster
    // before it replaces the local one.
    let removed = match resolve_participant_id(session, hosted) {
        Some(id) => !hosted.contains_participant_id(&id),
        None => true,
    };

    let total = session.questions.len();
    session.participants = hosted
        .participants
        .iter()
        .map(|p| p.display_name.clone())
        .collect();
    session.responses = hosted
        .participants
        .iter()
        .map(|p| {
            let mut slots = hosted.responses.get(&p.id).cloned().unwrap_or_default();
            slots.resize(total, None);
            (p.display_name.clone(), slots)
        })
        .collect();

    if !matches!(
        session.state,
        SessionState::Instructions | SessionState::Complete
    ) {
        if session.all_participants_complete() {
            session.mark_complete();
        } else if !removed {
            let own_name = session
                .online
                .as_ref()
                .map(|o| o.display_name.clone())
                .unwrap_or_default();
            if session.is_participant_complete(&own_name) {
                session.state = SessionState::AwaitingResponses;
            }
        }
    }

    if let Some(online) = session.online.as_mut() {
        online.applied_revision = Some(hosted.revision);
        if removed {
            online.participant_id = None;
        }
    }

    SnapshotOutcome::Applied { removed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::hosted::HostedParticipant;
    use crate::session::model::{Answer, OnlineDetails};
    use std::collections::HashMap;

    fn hosted(revision: u64, bob_answers: Vec<Option<Answer>>) -> HostedSession {
        HostedSession {
            session_id: "remote-1".to_string(),
            host_identity: "pid-alice".to_string(),
            revision,
            title: "Movie night".to_string(),
            questions: vec!["Q1".to_string(), "Q2".to_string()],
            participants: vec![
                HostedParticipant {
                    id: "pid-alice".to_string(),
                    display_name: "Alice".to_string(),
                },
                HostedParticipant {
                    id: "pid-bob".to_string(),
                    display_name: "Bob".to_string(),
                },
            ],
            responses: HashMap::from([
                (
                    "pid-alice".to_string(),
                    vec![Some(Answer::Yes), Some(Answer::No)],
                ),
                ("pid-bob".to_string(), bob_answers),
            ]),
        }
    }

    fn alices_session() -> Session {
        let mut session = Session::from_hosted(&hosted(1, vec![None, None]), "Alice");
        session.state = SessionState::Answering;
        session
    }

    #[test]
    fn merge_replaces_roster_and_responses_verbatim() {
        let mut session = alices_session();
        session.participants = vec!["Alice".to_string(), "Ghost".to_string()];
        session
            .responses
            .insert("Ghost".to_string(), vec![Some(Answer::Maybe), None]);

        let outcome = apply_snapshot(&hosted(1, vec![None, None]), &mut session);
        assert_eq!(outcome, SnapshotOutcome::Applied { removed: false });
        assert_eq!(session.participants, vec!["Alice", "Bob"]);
        assert!(!session.responses.contains_key("Ghost"));
        assert!(
            session
                .responses
                .keys()
                .all(|name| session.participants.contains(name))
        );
    }

    #[test]
    fn applying_the_same_snapshot_twice_is_idempotent() {
        let mut session = alices_session();
        let snapshot = hosted(1, vec![Some(Answer::Maybe), None]);

        let first = apply_snapshot(&snapshot, &mut session);
        assert!(first.is_applied());
        let merged = session.clone();

        let second = apply_snapshot(&snapshot, &mut session);
        assert_eq!(second, SnapshotOutcome::Stale { revision: 1 });
        assert!(!second.removed());
        assert_eq!(session, merged);
    }

    #[test]
    fn own_completion_forces_awaiting_then_complete() {
        let mut session = alices_session();

        // Alice complete, Bob incomplete.
        let outcome = apply_snapshot(&hosted(1, vec![Some(Answer::Yes), None]), &mut session);
        assert!(outcome.is_applied());
        assert_eq!(session.state, SessionState::AwaitingResponses);

        // Bob completes both; the next merge completes the session.
        let outcome = apply_snapshot(
            &hosted(2, vec![Some(Answer::Yes), Some(Answer::No)]),
            &mut session,
        );
        assert!(outcome.is_applied());
        assert_eq!(session.state, SessionState::Complete);
        assert!(session.complete_date.is_some());
    }

    #[test]
    fn older_revisions_are_dropped() {
        let mut session = alices_session();
        apply_snapshot(&hosted(5, vec![None, None]), &mut session);

        let before = session.clone();
        let outcome = apply_snapshot(&hosted(3, vec![Some(Answer::Yes), None]), &mut session);
        assert_eq!(outcome, SnapshotOutcome::Stale { revision: 3 });
        assert_eq!(session, before);
    }

    #[test]
    fn removal_is_detected_and_cached_identity_cleared() {
        let mut session = alices_session();
        apply_snapshot(&hosted(1, vec![None, None]), &mut session);
        assert_eq!(
            session.online.as_ref().unwrap().participant_id,
            Some("pid-alice".to_string())
        );

        // A newer snapshot without Alice in the roster.
        let mut without_alice = hosted(2, vec![None, None]);
        without_alice.participants.remove(0);
        without_alice.responses.remove("pid-alice");

        let outcome = apply_snapshot(&without_alice, &mut session);
        assert_eq!(outcome, SnapshotOutcome::Applied { removed: true });
        assert_eq!(session.participants, vec!["Bob"]);
        assert_eq!(session.online.as_ref().unwrap().participant_id, None);
    }

    #[test]
    fn snapshots_for_other_sessions_are_ignored() {
        let mut session = alices_session();
        let mut other = hosted(9, vec![None, None]);
        other.session_id = "remote-2".to_string();

        let before = session.clone();
        let outcome = apply_snapshot(&other, &mut session);
        assert!(!outcome.is_applied());
        assert_eq!(session, before);
    }

    #[test]
    fn instructions_state_is_left_untouched_by_merge() {
        let mut session = Session::from_hosted(&hosted(1, vec![None, None]), "Alice");
        assert_eq!(session.state, SessionState::Instructions);
        apply_snapshot(
            &hosted(1, vec![Some(Answer::Yes), Some(Answer::No)]),
            &mut session,
        );
        assert_eq!(session.state, SessionState::Instructions);
    }
}
