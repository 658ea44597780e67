//! Session domain model.
//!
//! This module contains the core `Session` entity representing one run of a
//! questionnaire by a set of participants, either offline (one device passed
//! around) or online (each participant on their own device, synchronized
//! through the remote record store).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::hosted::HostedSession;
use super::state::SessionState;
use crate::error::{OverlapError, Result};

/// A single recorded answer to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Yes,
    No,
    Maybe,
}

/// Remote-backing details for an online session.
///
/// Present only when the session is backed by a record in the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineDetails {
    /// Identifier of the authoritative remote record.
    pub session_id: String,
    /// Stable participant identifier for this device, resolved lazily from
    /// the display name and cached here. `None` until first resolution, and
    /// cleared again if the participant is removed from the roster.
    #[serde(default)]
    pub participant_id: Option<String>,
    /// Display name this device joined (or hosted) the session under.
    pub display_name: String,
    /// Revision of the last snapshot merged into the local session. Used to
    /// drop stale snapshots and keep merges idempotent.
    #[serde(default)]
    pub applied_revision: Option<u64>,
}

impl OnlineDetails {
    /// Creates online details for a freshly hosted or joined session.
    pub fn new(session_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            participant_id: None,
            display_name: display_name.into(),
            applied_revision: None,
        }
    }
}

/// Represents one run of a questionnaire in the application's domain layer.
///
/// A session contains:
/// - The display copy inherited from the source questionnaire at creation
/// - The ordered questions (fixed for the session's lifetime)
/// - The ordered participant roster (editable only during `Instructions`)
/// - One answer slot per (participant, question); `None` = unanswered
/// - The state machine value driving the run
/// - Turn cursors used only in offline single-device mode
/// - Optional remote-backing details for online sessions
///
/// Invariant: `responses` never contains an entry for a name absent from
/// `participants`. For online sessions the roster mirrors the remote record
/// after every successful merge and must not be mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format), assigned at creation.
    pub id: String,
    /// Human-readable session title.
    pub title: String,
    /// Introductory copy shown before the questionnaire.
    pub information: String,
    /// Instructions shown while the roster is assembled.
    pub instructions: String,
    /// Ordered question text. Fixed length for the session's lifetime.
    pub questions: Vec<String>,
    /// Ordered participant display names.
    pub participants: Vec<String>,
    /// Display name -> one answer slot per question.
    pub responses: HashMap<String, Vec<Option<Answer>>>,
    /// Current state machine value.
    pub state: SessionState,
    /// Offline-mode cursor: whose turn it is.
    #[serde(default)]
    pub current_participant_index: usize,
    /// Offline-mode cursor: which question is being answered.
    #[serde(default)]
    pub current_question_index: usize,
    /// Remote-backing details, present only for online sessions.
    #[serde(default)]
    pub online: Option<OnlineDetails>,
    /// Timestamp when the session was begun (RFC 3339). Set once.
    #[serde(default)]
    pub begin_date: Option<String>,
    /// Timestamp when the session completed (RFC 3339). Set once.
    #[serde(default)]
    pub complete_date: Option<String>,
    /// Timestamp when the session was created (RFC 3339).
    pub created_at: String,
    /// Timestamp when the session was last updated (RFC 3339).
    pub updated_at: String,
}

impl Session {
    /// Creates a new offline session from questionnaire copy.
    pub fn new(
        title: impl Into<String>,
        information: impl Into<String>,
        instructions: impl Into<String>,
        questions: Vec<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            information: information.into(),
            instructions: instructions.into(),
            questions,
            participants: Vec::new(),
            responses: HashMap::new(),
            state: SessionState::Instructions,
            current_participant_index: 0,
            current_question_index: 0,
            online: None,
            begin_date: None,
            complete_date: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Builds a local session for a device joining an online session.
    ///
    /// The title and questions come from the remote snapshot; the roster and
    /// responses are filled in by the first snapshot merge.
    pub fn from_hosted(hosted: &HostedSession, display_name: impl Into<String>) -> Self {
        let mut session = Self::new(hosted.title.clone(), "", "", hosted.questions.clone());
        session.online = Some(OnlineDetails::new(hosted.session_id.clone(), display_name));
        session
    }

    /// Whether this session is backed by a remote record.
    pub fn is_online(&self) -> bool {
        self.online.is_some()
    }

    /// Number of questions in the questionnaire.
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Adds a participant to the roster.
    ///
    /// Only allowed while the session is still in `Instructions`, and never
    /// for online sessions, whose roster is owned by the remote store.
    /// Display names are unique per session (case-insensitive).
    pub fn add_participant(&mut self, name: impl Into<String>) -> Result<()> {
        if self.state != SessionState::Instructions {
            return Err(OverlapError::invalid_transition(
                self.state,
                "the roster is frozen once the session leaves the instructions step",
            ));
        }
        if self.is_online() {
            return Err(OverlapError::invalid_transition(
                self.state,
                "online rosters are managed through the record store",
            ));
        }
        let name = name.into();
        let needle = name.to_lowercase();
        if self
            .participants
            .iter()
            .any(|p| p.to_lowercase() == needle)
        {
            return Err(OverlapError::DuplicateParticipant { name });
        }
        self.participants.push(name);
        Ok(())
    }

    /// The question the session is currently waiting on, if any.
    ///
    /// Offline this follows the turn cursors. Online each device only ever
    /// advances its own participant, so "current" is the local participant's
    /// first unanswered question. `None` when no participant or question
    /// remains.
    pub fn current_question(&self) -> Option<&str> {
        if let Some(online) = &self.online {
            let slots = self.response_slots(&online.display_name)?;
            let index = slots.iter().position(|slot| slot.is_none())?;
            self.questions.get(index).map(String::as_str)
        } else {
            self.participants.get(self.current_participant_index)?;
            self.questions
                .get(self.current_question_index)
                .map(String::as_str)
        }
    }

    /// Fraction of answered slots across all participants, 0.0 when empty.
    pub fn completion_percentage(&self) -> f64 {
        let total = self.participants.len() * self.questions.len();
        if total == 0 {
            return 0.0;
        }
        self.answered_count() as f64 / total as f64
    }

    /// Number of answered slots across all participants.
    pub fn answered_count(&self) -> usize {
        self.responses
            .values()
            .map(|slots| slots.iter().filter(|slot| slot.is_some()).count())
            .sum()
    }

    /// Whether every question slot for the named participant is answered.
    pub fn is_participant_complete(&self, name: &str) -> bool {
        match self.response_slots(name) {
            Some(slots) => (0..self.questions.len())
                .all(|index| slots.get(index).is_some_and(|slot| slot.is_some())),
            None => false,
        }
    }

    /// Whether every participant has answered every question.
    ///
    /// False for an empty roster; a session nobody is part of is not done.
    pub fn all_participants_complete(&self) -> bool {
        !self.participants.is_empty()
            && self
                .participants
                .iter()
                .all(|name| self.is_participant_complete(name))
    }

    /// Looks up a participant's answer slots by display name,
    /// case-insensitively.
    pub fn response_slots(&self, name: &str) -> Option<&Vec<Option<Answer>>> {
        let needle = name.to_lowercase();
        self.responses
            .iter()
            .find(|(key, _)| key.to_lowercase() == needle)
            .map(|(_, slots)| slots)
    }

    /// The roster entry matching a display name, case-insensitively.
    pub fn roster_name(&self, name: &str) -> Option<&str> {
        let needle = name.to_lowercase();
        self.participants
            .iter()
            .find(|p| p.to_lowercase() == needle)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responses_match_roster(session: &Session) -> bool {
        session
            .responses
            .keys()
            .all(|name| session.participants.contains(name))
    }

    fn two_by_three() -> Session {
        let mut session = Session::new(
            "Movie night",
            "Answer honestly.",
            "Pass the device around.",
            vec![
                "Popcorn?".to_string(),
                "Subtitles?".to_string(),
                "Sequels?".to_string(),
            ],
        );
        session.add_participant("Alice").unwrap();
        session.add_participant("Bob").unwrap();
        session
    }

    #[test]
    fn completion_percentage_counts_all_slots() {
        let mut session = two_by_three();
        session.begin().unwrap();
        // 2 participants x 3 questions, 3 answers recorded
        session.acknowledge_handoff().unwrap();
        session.record_answer(Answer::Yes).unwrap();
        session.record_answer(Answer::No).unwrap();
        session.record_answer(Answer::Maybe).unwrap();
        assert_eq!(session.completion_percentage(), 0.5);
        assert!(responses_match_roster(&session));
    }

    #[test]
    fn completion_percentage_is_zero_for_empty_session() {
        let session = Session::new("Empty", "", "", Vec::new());
        assert_eq!(session.completion_percentage(), 0.0);
    }

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        let mut session = two_by_three();
        let err = session.add_participant("alice").unwrap_err();
        assert!(matches!(err, OverlapError::DuplicateParticipant { .. }));
        assert!(responses_match_roster(&session));
    }

    #[test]
    fn roster_is_frozen_after_begin() {
        let mut session = two_by_three();
        session.begin().unwrap();
        assert!(session.add_participant("Carol").is_err());
    }

    #[test]
    fn current_question_follows_offline_cursors() {
        let mut session = two_by_three();
        session.begin().unwrap();
        session.acknowledge_handoff().unwrap();
        assert_eq!(session.current_question(), Some("Popcorn?"));
        session.record_answer(Answer::Yes).unwrap();
        assert_eq!(session.current_question(), Some("Subtitles?"));
    }

    #[test]
    fn current_question_is_first_unanswered_slot_online() {
        let mut session = Session::new(
            "Online",
            "",
            "",
            vec!["Q1".to_string(), "Q2".to_string()],
        );
        session.online = Some(OnlineDetails::new("remote-1", "Alice"));
        session.participants = vec!["Alice".to_string()];
        session
            .responses
            .insert("Alice".to_string(), vec![Some(Answer::Yes), None]);
        assert_eq!(session.current_question(), Some("Q2"));

        session.responses.insert(
            "Alice".to_string(),
            vec![Some(Answer::Yes), Some(Answer::No)],
        );
        assert_eq!(session.current_question(), None);
    }

    #[test]
    fn participant_completion_requires_every_slot() {
        let mut session = two_by_three();
        session.begin().unwrap();
        assert!(!session.is_participant_complete("Alice"));
        session.responses.insert(
            "Alice".to_string(),
            vec![Some(Answer::Yes), Some(Answer::Yes), Some(Answer::No)],
        );
        assert!(session.is_participant_complete("Alice"));
        assert!(session.is_participant_complete("ALICE"));
        assert!(!session.all_participants_complete());
    }
}
