//! Session state machine.
//!
//! States progress `Instructions -> NextParticipant -> Answering ->
//! AwaitingResponses -> Complete`. `Instructions` is the initial state (the
//! roster is still editable); `Complete` is terminal. The only backwards
//! transition is the forced reset to `Instructions` when the synchronization
//! layer determines the local participant was removed from the session.

use serde::{Deserialize, Serialize};

use super::model::{Answer, Session};
use crate::error::{OverlapError, Result};

/// The state machine value for one questionnaire run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Roster assembly; at least two participants are required to progress.
    Instructions,
    /// Hand-off screen before the next participant starts answering.
    NextParticipant,
    /// The current participant is answering questions.
    Answering,
    /// The local participant is done; other devices are still answering.
    AwaitingResponses,
    /// Every participant has answered every question. Terminal.
    Complete,
}

impl SessionState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl Session {
    /// Begins the session: `Instructions -> NextParticipant`.
    ///
    /// Requires at least two participants. Seeds an empty response entry for
    /// every participant and sets `begin_date` once.
    pub fn begin(&mut self) -> Result<()> {
        if self.state != SessionState::Instructions {
            return Err(OverlapError::invalid_transition(
                self.state,
                "only a session in the instructions step can begin",
            ));
        }
        if self.participants.len() < 2 {
            return Err(OverlapError::invalid_transition(
                self.state,
                "at least two participants are required",
            ));
        }
        let total = self.questions.len();
        for name in &self.participants {
            self.responses
                .entry(name.clone())
                .or_insert_with(|| vec![None; total]);
        }
        self.current_participant_index = 0;
        self.current_question_index = 0;
        if self.begin_date.is_none() {
            self.begin_date = Some(chrono::Utc::now().to_rfc3339());
        }
        self.state = SessionState::NextParticipant;
        Ok(())
    }

    /// The current participant acknowledges the hand-off screen:
    /// `NextParticipant -> Answering`.
    pub fn acknowledge_handoff(&mut self) -> Result<()> {
        if self.state != SessionState::NextParticipant {
            return Err(OverlapError::invalid_transition(
                self.state,
                "no participant is waiting at the hand-off screen",
            ));
        }
        self.state = SessionState::Answering;
        Ok(())
    }

    /// Records the current participant's answer to the current question in
    /// offline single-device mode, then advances the turn cursors.
    ///
    /// Stays in `Answering` while questions remain for the current
    /// participant; moves to `NextParticipant` when they finish and others
    /// remain; moves to `Complete` once everyone has finished.
    pub fn record_answer(&mut self, answer: Answer) -> Result<()> {
        if self.state != SessionState::Answering {
            return Err(OverlapError::invalid_transition(
                self.state,
                "answers can only be recorded while answering",
            ));
        }
        if self.is_online() {
            return Err(OverlapError::invalid_transition(
                self.state,
                "online sessions record answers through the sync service",
            ));
        }
        let name = self
            .participants
            .get(self.current_participant_index)
            .cloned()
            .ok_or_else(|| OverlapError::internal("participant cursor out of range"))?;
        let total = self.questions.len();
        if self.current_question_index >= total {
            return Err(OverlapError::internal("question cursor out of range"));
        }
        let slots = self
            .responses
            .entry(name)
            .or_insert_with(|| vec![None; total]);
        slots[self.current_question_index] = Some(answer);

        if self.current_question_index + 1 < total {
            self.current_question_index += 1;
        } else if self.current_participant_index + 1 < self.participants.len() {
            self.current_participant_index += 1;
            self.current_question_index = 0;
            self.state = SessionState::NextParticipant;
        } else {
            self.mark_complete();
        }
        Ok(())
    }

    /// Records the local participant's answer in online mode.
    ///
    /// Each device only advances its own participant, so the slot index is
    /// explicit rather than cursor-driven. The resulting state is derived
    /// from completion via [`Session::recompute_online_state`].
    pub fn record_own_answer(&mut self, question_index: usize, answer: Answer) -> Result<()> {
        let Some(online) = &self.online else {
            return Err(OverlapError::invalid_transition(
                self.state,
                "not an online session",
            ));
        };
        if self.state != SessionState::Answering {
            return Err(OverlapError::invalid_transition(
                self.state,
                "answers can only be recorded while answering",
            ));
        }
        if question_index >= self.questions.len() {
            return Err(OverlapError::internal(format!(
                "question index {} out of range",
                question_index
            )));
        }
        let display_name = online.display_name.clone();
        let name = self
            .roster_name(&display_name)
            .map(str::to_string)
            .ok_or_else(|| OverlapError::participant_not_in_session(display_name))?;
        let total = self.questions.len();
        let slots = self
            .responses
            .entry(name)
            .or_insert_with(|| vec![None; total]);
        if slots.len() < total {
            slots.resize(total, None);
        }
        slots[question_index] = Some(answer);
        self.recompute_online_state();
        Ok(())
    }

    /// Derives the state of an online session from completion data.
    ///
    /// Forward only: all participants complete forces `Complete`; the local
    /// participant complete while others are not forces `AwaitingResponses`;
    /// otherwise the state is left alone. `Instructions` and `Complete` are
    /// never touched.
    pub fn recompute_online_state(&mut self) {
        if matches!(
            self.state,
            SessionState::Instructions | SessionState::Complete
        ) {
            return;
        }
        if self.all_participants_complete() {
            self.mark_complete();
            return;
        }
        let own_name = self.online.as_ref().map(|o| o.display_name.clone());
        if let Some(name) = own_name {
            if self.is_participant_complete(&name) {
                self.state = SessionState::AwaitingResponses;
            }
        }
    }

    /// Forced recovery transition back to `Instructions`.
    ///
    /// Used when the local participant identity is no longer part of the
    /// session (removed mid-run). Clears the cached participant ID so a
    /// re-join resolves a fresh identity. Not a user action.
    pub fn reset_to_instructions(&mut self) {
        self.state = SessionState::Instructions;
        self.current_participant_index = 0;
        self.current_question_index = 0;
        if let Some(online) = &mut self.online {
            online.participant_id = None;
        }
    }

    pub(crate) fn mark_complete(&mut self) {
        self.state = SessionState::Complete;
        if self.complete_date.is_none() {
            self.complete_date = Some(chrono::Utc::now().to_rfc3339());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::OnlineDetails;

    fn session_with(names: &[&str], questions: &[&str]) -> Session {
        let mut session = Session::new(
            "Test",
            "",
            "",
            questions.iter().map(|q| q.to_string()).collect(),
        );
        for name in names {
            session.add_participant(*name).unwrap();
        }
        session
    }

    #[test]
    fn begin_requires_two_participants() {
        let mut session = session_with(&["Alice"], &["Q1"]);
        let err = session.begin().unwrap_err();
        assert!(matches!(err, OverlapError::InvalidTransition { .. }));
        assert_eq!(session.state, SessionState::Instructions);
    }

    #[test]
    fn begin_seeds_empty_responses_for_every_participant() {
        let mut session = session_with(&["Alice", "Bob"], &["Q1", "Q2"]);
        session.begin().unwrap();
        assert_eq!(session.state, SessionState::NextParticipant);
        assert!(session.begin_date.is_some());
        assert_eq!(session.responses["Alice"], vec![None, None]);
        assert_eq!(session.responses["Bob"], vec![None, None]);
    }

    #[test]
    fn full_offline_walk_reaches_complete() {
        let mut session = session_with(&["Alice", "Bob"], &["Q1", "Q2"]);
        session.begin().unwrap();

        // Alice answers both questions.
        session.acknowledge_handoff().unwrap();
        session.record_answer(Answer::Yes).unwrap();
        assert_eq!(session.state, SessionState::Answering);
        session.record_answer(Answer::No).unwrap();
        assert_eq!(session.state, SessionState::NextParticipant);

        // Bob answers both questions.
        session.acknowledge_handoff().unwrap();
        session.record_answer(Answer::Maybe).unwrap();
        session.record_answer(Answer::Yes).unwrap();

        assert_eq!(session.state, SessionState::Complete);
        assert!(session.complete_date.is_some());
        assert_eq!(session.completion_percentage(), 1.0);
    }

    #[test]
    fn answers_cannot_be_recorded_outside_answering() {
        let mut session = session_with(&["Alice", "Bob"], &["Q1"]);
        session.begin().unwrap();
        let err = session.record_answer(Answer::Yes).unwrap_err();
        assert!(matches!(err, OverlapError::InvalidTransition { .. }));
    }

    #[test]
    fn own_answer_forces_awaiting_responses_when_others_remain() {
        let mut session = session_with(&["Alice", "Bob"], &["Q1", "Q2"]);
        session.begin().unwrap();
        session.online = Some(OnlineDetails::new("remote-1", "Alice"));
        session.acknowledge_handoff().unwrap();

        session.record_own_answer(0, Answer::Yes).unwrap();
        assert_eq!(session.state, SessionState::Answering);
        session.record_own_answer(1, Answer::No).unwrap();
        assert_eq!(session.state, SessionState::AwaitingResponses);
    }

    #[test]
    fn state_never_regresses_through_recompute() {
        let mut session = session_with(&["Alice", "Bob"], &["Q1"]);
        session.begin().unwrap();
        session.online = Some(OnlineDetails::new("remote-1", "Alice"));
        session.acknowledge_handoff().unwrap();
        session.record_own_answer(0, Answer::Yes).unwrap();
        assert_eq!(session.state, SessionState::AwaitingResponses);

        // Recomputing with unchanged data keeps the state put.
        session.recompute_online_state();
        assert_eq!(session.state, SessionState::AwaitingResponses);

        // Bob finishing completes the session; Complete is sticky.
        session
            .responses
            .insert("Bob".to_string(), vec![Some(Answer::No)]);
        session.recompute_online_state();
        assert_eq!(session.state, SessionState::Complete);
        session.recompute_online_state();
        assert_eq!(session.state, SessionState::Complete);
    }

    #[test]
    fn reset_returns_to_instructions_and_clears_identity() {
        let mut session = session_with(&["Alice", "Bob"], &["Q1"]);
        session.begin().unwrap();
        session.online = Some(OnlineDetails::new("remote-1", "Alice"));
        if let Some(online) = &mut session.online {
            online.participant_id = Some("pid-1".to_string());
        }

        session.reset_to_instructions();
        assert_eq!(session.state, SessionState::Instructions);
        assert_eq!(session.online.as_ref().unwrap().participant_id, None);
        assert_eq!(session.current_participant_index, 0);
    }

    #[test]
    fn begin_date_is_never_rewound() {
        let mut session = session_with(&["Alice", "Bob"], &["Q1"]);
        session.begin().unwrap();
        let first = session.begin_date.clone();
        session.reset_to_instructions();
        session.begin().unwrap();
        assert_eq!(session.begin_date, first);
    }
}
