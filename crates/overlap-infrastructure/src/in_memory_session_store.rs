//! In-memory RemoteSessionStore implementation.
//!
//! Holds one authoritative `HostedSession` record per session behind a
//! `tokio::sync::RwLock`, replaced wholesale on every mutation. Revisions
//! increase monotonically, and writes that change nothing do not bump the
//! revision, which keeps retried answer submissions idempotent per
//! (participant, question index).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use overlap_core::error::{OverlapError, Result};
use overlap_core::invite::Invite;
use overlap_core::remote::RemoteSessionStore;
use overlap_core::session::{Answer, HostedParticipant, HostedSession};

/// An in-memory store of hosted session records.
#[derive(Default)]
pub struct InMemorySessionStore {
    records: RwLock<HashMap<String, HostedSession>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held. Test and diagnostics helper.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RemoteSessionStore for InMemorySessionStore {
    async fn create_session(
        &self,
        title: &str,
        questions: &[String],
        host_display_name: &str,
    ) -> Result<(String, HostedSession)> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let host_id = uuid::Uuid::new_v4().to_string();
        let hosted = HostedSession {
            session_id: session_id.clone(),
            host_identity: host_id.clone(),
            revision: 1,
            title: title.to_string(),
            questions: questions.to_vec(),
            participants: vec![HostedParticipant {
                id: host_id.clone(),
                display_name: host_display_name.to_string(),
            }],
            responses: HashMap::from([(host_id, vec![None; questions.len()])]),
        };

        let mut records = self.records.write().await;
        records.insert(session_id.clone(), hosted.clone());
        tracing::info!(
            target: "record_store",
            "Created session {} hosted by '{}'",
            session_id,
            host_display_name
        );
        Ok((session_id, hosted))
    }

    async fn fetch_session(&self, session_id: &str) -> Result<HostedSession> {
        let records = self.records.read().await;
        records
            .get(session_id)
            .cloned()
            .ok_or_else(|| OverlapError::session_not_found(session_id))
    }

    async fn submit_answer(
        &self,
        session_id: &str,
        participant_id: &str,
        question_index: usize,
        answer: Answer,
    ) -> Result<HostedSession> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(session_id)
            .ok_or_else(|| OverlapError::session_not_found(session_id))?;
        if !record.contains_participant_id(participant_id) {
            return Err(OverlapError::participant_not_in_session(participant_id));
        }
        if question_index >= record.questions.len() {
            return Err(OverlapError::internal(format!(
                "question index {} out of range for session {}",
                question_index, session_id
            )));
        }

        let total = record.questions.len();
        let slots = record
            .responses
            .entry(participant_id.to_string())
            .or_insert_with(|| vec![None; total]);
        if slots.len() < total {
            slots.resize(total, None);
        }
        // An identical retried submission leaves the record (and revision)
        // untouched.
        if slots[question_index] != Some(answer) {
            slots[question_index] = Some(answer);
            record.revision += 1;
        }
        Ok(record.clone())
    }

    async fn join_session(
        &self,
        invite: &Invite,
        display_name: &str,
    ) -> Result<(String, HostedSession)> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&invite.session_id)
            .ok_or_else(|| OverlapError::session_not_found(&invite.session_id))?;

        // A display name already in the roster reuses its identity: this is
        // a rejoin from a new device, not a second participant.
        if record.participant_id_for(display_name).is_none() {
            let participant_id = uuid::Uuid::new_v4().to_string();
            let total = record.questions.len();
            record.participants.push(HostedParticipant {
                id: participant_id.clone(),
                display_name: display_name.to_string(),
            });
            record
                .responses
                .insert(participant_id, vec![None; total]);
            record.revision += 1;
            tracing::info!(
                target: "record_store",
                "'{}' joined session {}",
                display_name,
                invite.session_id
            );
        }
        Ok((invite.session_id.clone(), record.clone()))
    }

    fn parse_invite(&self, raw_link: &str) -> Option<Invite> {
        Invite::parse(raw_link)
    }

    fn invite_link(&self, session_id: &str, hint: Option<&str>) -> String {
        Invite::new(session_id, hint.map(str::to_string)).to_link()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions() -> Vec<String> {
        vec!["Q1".to_string(), "Q2".to_string()]
    }

    #[tokio::test]
    async fn create_registers_the_host() {
        let store = InMemorySessionStore::new();
        let (id, hosted) = store
            .create_session("Movie night", &questions(), "Alice")
            .await
            .unwrap();

        assert_eq!(hosted.session_id, id);
        assert_eq!(hosted.revision, 1);
        assert_eq!(hosted.participants.len(), 1);
        assert_eq!(hosted.participants[0].display_name, "Alice");
        assert_eq!(hosted.host_identity, hosted.participants[0].id);
        assert_eq!(hosted.responses[&hosted.host_identity], vec![None, None]);
    }

    #[tokio::test]
    async fn fetch_missing_session_fails_with_not_found() {
        let store = InMemorySessionStore::new();
        let err = store.fetch_session("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn join_appends_to_roster_and_bumps_revision() {
        let store = InMemorySessionStore::new();
        let (id, _) = store
            .create_session("T", &questions(), "Alice")
            .await
            .unwrap();

        let invite = Invite::new(id.clone(), None);
        let (_, hosted) = store.join_session(&invite, "Bob").await.unwrap();
        assert_eq!(hosted.revision, 2);
        assert_eq!(hosted.participants.len(), 2);
        assert!(hosted.participant_id_for("Bob").is_some());
    }

    #[tokio::test]
    async fn rejoining_reuses_the_existing_identity() {
        let store = InMemorySessionStore::new();
        let (id, first) = store
            .create_session("T", &questions(), "Alice")
            .await
            .unwrap();

        let invite = Invite::new(id, None);
        let (_, hosted) = store.join_session(&invite, "ALICE").await.unwrap();
        assert_eq!(hosted.participants.len(), 1);
        assert_eq!(hosted.revision, first.revision);
    }

    #[tokio::test]
    async fn submit_is_idempotent_per_slot() {
        let store = InMemorySessionStore::new();
        let (id, hosted) = store
            .create_session("T", &questions(), "Alice")
            .await
            .unwrap();
        let alice = hosted.host_identity.clone();

        let after_first = store
            .submit_answer(&id, &alice, 0, Answer::Yes)
            .await
            .unwrap();
        assert_eq!(after_first.revision, 2);

        // Retrying the same submission changes nothing.
        let after_retry = store
            .submit_answer(&id, &alice, 0, Answer::Yes)
            .await
            .unwrap();
        assert_eq!(after_retry, after_first);

        // A different answer for the same slot is last-writer-wins.
        let after_change = store
            .submit_answer(&id, &alice, 0, Answer::No)
            .await
            .unwrap();
        assert_eq!(after_change.revision, 3);
        assert_eq!(after_change.responses[&alice][0], Some(Answer::No));
    }

    #[tokio::test]
    async fn submit_rejects_unknown_participants() {
        let store = InMemorySessionStore::new();
        let (id, _) = store
            .create_session("T", &questions(), "Alice")
            .await
            .unwrap();

        let err = store
            .submit_answer(&id, "pid-ghost", 0, Answer::Yes)
            .await
            .unwrap_err();
        assert!(err.is_identity_failure());
    }

    #[tokio::test]
    async fn invite_links_round_trip_through_the_store() {
        let store = InMemorySessionStore::new();
        let link = store.invite_link("session-1", Some("Alice"));
        let invite = store.parse_invite(&link).unwrap();
        assert_eq!(invite.session_id, "session-1");
        assert_eq!(invite.hint.as_deref(), Some("Alice"));
        assert_eq!(store.parse_invite("not-a-link"), None);
    }
}
