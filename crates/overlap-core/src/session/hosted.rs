//! Remote-origin session snapshot.
//!
//! A `HostedSession` is the authoritative snapshot of an online session as
//! held by the remote record store. It is created by the host, replaced
//! wholesale on every remote mutation, and never patched in place. Outside
//! the record store it is read-only; local state only changes by merging a
//! freshly fetched snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::model::Answer;

/// One roster entry: the stable participant ID and the display name it was
/// registered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedParticipant {
    pub id: String,
    pub display_name: String,
}

/// The authoritative remote snapshot of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostedSession {
    /// Remote record identifier.
    pub session_id: String,
    /// Participant ID of the hosting device.
    pub host_identity: String,
    /// Monotonically increasing revision marker; bumped on every mutation.
    pub revision: u64,
    /// Session title, carried so joining devices can build a local session.
    pub title: String,
    /// Ordered question text.
    pub questions: Vec<String>,
    /// Ordered roster, carrying the display-name to ID mapping.
    pub participants: Vec<HostedParticipant>,
    /// Participant ID -> one answer slot per question.
    pub responses: HashMap<String, Vec<Option<Answer>>>,
}

impl HostedSession {
    /// Resolves a display name to its participant ID, case-insensitively.
    pub fn participant_id_for(&self, display_name: &str) -> Option<String> {
        let needle = display_name.to_lowercase();
        self.participants
            .iter()
            .find(|p| p.display_name.to_lowercase() == needle)
            .map(|p| p.id.clone())
    }

    /// Resolves a participant ID back to its display name.
    pub fn display_name_for(&self, participant_id: &str) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.id == participant_id)
            .map(|p| p.display_name.as_str())
    }

    /// Whether the roster contains the given participant ID.
    pub fn contains_participant_id(&self, participant_id: &str) -> bool {
        self.participants.iter().any(|p| p.id == participant_id)
    }

    /// Whether the given participant has answered every question.
    pub fn is_participant_complete(&self, participant_id: &str) -> bool {
        match self.responses.get(participant_id) {
            Some(slots) => (0..self.questions.len())
                .all(|index| slots.get(index).is_some_and(|slot| slot.is_some())),
            None => false,
        }
    }

    /// Whether every participant in the roster has answered every question.
    pub fn all_participants_complete(&self) -> bool {
        !self.participants.is_empty()
            && self
                .participants
                .iter()
                .all(|p| self.is_participant_complete(&p.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> HostedSession {
        HostedSession {
            session_id: "remote-1".to_string(),
            host_identity: "pid-alice".to_string(),
            revision: 3,
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
                ("pid-bob".to_string(), vec![Some(Answer::Maybe), None]),
            ]),
        }
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        let hosted = snapshot();
        assert_eq!(
            hosted.participant_id_for("aLiCe"),
            Some("pid-alice".to_string())
        );
        assert_eq!(hosted.participant_id_for("Carol"), None);
    }

    #[test]
    fn completion_checks_every_slot() {
        let hosted = snapshot();
        assert!(hosted.is_participant_complete("pid-alice"));
        assert!(!hosted.is_participant_complete("pid-bob"));
        assert!(!hosted.is_participant_complete("pid-ghost"));
        assert!(!hosted.all_participants_complete());
    }
}
