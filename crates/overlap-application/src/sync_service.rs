//! Session sync service.
//!
//! The single entry point the UI layer uses to mutate online sessions:
//! submitting answers, merging observer-delivered snapshots, hosting and
//! joining sessions, and manual refresh. Every remote mutation resolves the
//! local participant identity first; an unresolved identity means the
//! participant was removed and forces the recovery reset instead of a
//! remote call.
//!
//! Failures of mutating operations are surfaced as typed errors and never
//! silently retried; retry is the caller's decision, and the record store
//! keeps retried submissions idempotent per (participant, question index).

use std::sync::Arc;

use tokio::sync::broadcast;

use overlap_core::error::{OverlapError, Result};
use overlap_core::remote::RemoteSessionStore;
use overlap_core::repository::SessionRepository;
use overlap_core::session::{
    Answer, HostedSession, Session, SessionEvent, apply_snapshot, resolve_participant_id,
};

use crate::observer::SessionObserverRegistry;

/// Orchestrates answer submission and snapshot merging for online sessions.
pub struct SessionSyncService {
    store: Arc<dyn RemoteSessionStore>,
    repository: Arc<dyn SessionRepository>,
    registry: Arc<SessionObserverRegistry>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionSyncService {
    /// Creates a sync service with its collaborators.
    ///
    /// Pass the same event sender the registry was built with so
    /// subscribers see observation and merge events on one channel.
    pub fn new(
        store: Arc<dyn RemoteSessionStore>,
        repository: Arc<dyn SessionRepository>,
        registry: Arc<SessionObserverRegistry>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            store,
            repository,
            registry,
            events,
        }
    }

    /// Subscribes to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Submits the local participant's answer to one question.
    ///
    /// Resolves the participant identity first; if the participant is no
    /// longer in the session, the local session is reset and
    /// `ParticipantNotInSession` is returned without contacting the remote
    /// store. On success the returned snapshot is merged into the session
    /// and persisted.
    pub async fn submit_answer(
        &self,
        session: &mut Session,
        question_index: usize,
        answer: Answer,
    ) -> Result<HostedSession> {
        let (remote_id, display_name) = online_details_of(session)?;
        if question_index >= session.total_questions() {
            return Err(OverlapError::internal(format!(
                "question index {} out of range",
                question_index
            )));
        }

        let participant_id = match self.resolve_identity(session, &remote_id).await? {
            Some(id) => id,
            None => {
                tracing::warn!(
                    target: "session_sync",
                    "'{}' is no longer part of session {}; resetting",
                    display_name,
                    remote_id
                );
                self.force_reset(session).await?;
                return Err(OverlapError::participant_not_in_session(display_name));
            }
        };

        let hosted = match self
            .store
            .submit_answer(&remote_id, &participant_id, question_index, answer)
            .await
        {
            Ok(hosted) => hosted,
            Err(err) if err.is_identity_failure() => {
                // The roster changed between resolution and submission.
                self.force_reset(session).await?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        tracing::debug!(
            target: "session_sync",
            "Answer submitted for session {} question {} (revision {})",
            remote_id,
            question_index,
            hosted.revision
        );
        self.handle_snapshot(session, &hosted).await?;
        Ok(hosted)
    }

    /// Merges an observer-delivered snapshot into a local session.
    ///
    /// Persists the session when the snapshot applied, and forces the
    /// recovery reset when the local participant was removed. Returns
    /// whether the participant was removed.
    pub async fn handle_snapshot(
        &self,
        session: &mut Session,
        hosted: &HostedSession,
    ) -> Result<bool> {
        let outcome = apply_snapshot(hosted, session);
        if !outcome.is_applied() {
            return Ok(false);
        }
        if outcome.removed() {
            self.force_reset(session).await?;
            return Ok(true);
        }
        self.persist(session).await?;
        let _ = self.events.send(SessionEvent::SessionUpdated {
            session_id: session.id.clone(),
        });
        Ok(false)
    }

    /// Creates the remote record for a local session, with this device's
    /// participant as host.
    ///
    /// Attaches online details, merges the initial snapshot (which makes
    /// the remote roster authoritative), persists, and starts observation.
    pub async fn host_session(
        &self,
        session: &mut Session,
        host_display_name: &str,
    ) -> Result<HostedSession> {
        if session.is_online() {
            return Err(OverlapError::internal(
                "session is already backed by a remote record",
            ));
        }
        let (remote_id, hosted) = self
            .store
            .create_session(&session.title, &session.questions, host_display_name)
            .await?;
        session.online = Some(overlap_core::session::OnlineDetails::new(
            remote_id.clone(),
            host_display_name,
        ));
        self.handle_snapshot(session, &hosted).await?;
        self.registry.start_observation(&remote_id).await;
        tracing::info!(
            target: "session_sync",
            "Session {} is now hosted online as {}",
            session.id,
            remote_id
        );
        Ok(hosted)
    }

    /// Produces the shareable invite link for a hosted session.
    pub fn invite_link(&self, session: &Session) -> Result<String> {
        let online = session
            .online
            .as_ref()
            .ok_or_else(|| OverlapError::internal("session is not online"))?;
        Ok(self
            .store
            .invite_link(&online.session_id, Some(&online.display_name)))
    }

    /// Joins an online session through a shareable link.
    ///
    /// Builds a local session from the remote snapshot, persists it, starts
    /// observation, and announces it for navigation.
    pub async fn join_session(&self, raw_link: &str, display_name: &str) -> Result<Session> {
        let invite = self
            .store
            .parse_invite(raw_link)
            .ok_or_else(|| OverlapError::invalid_invite("unrecognized link format"))?;
        let (remote_id, hosted) = self.store.join_session(&invite, display_name).await?;

        let mut session = Session::from_hosted(&hosted, display_name);
        self.handle_snapshot(&mut session, &hosted).await?;
        self.registry.start_observation(&remote_id).await;
        let _ = self.events.send(SessionEvent::NavigateToSession {
            session_id: session.id.clone(),
        });
        tracing::info!(
            target: "session_sync",
            "Joined session {} as '{}'",
            remote_id,
            display_name
        );
        Ok(session)
    }

    /// Stops observing a session and detaches it from its remote record.
    ///
    /// The local session and its merged answers remain.
    pub async fn leave_session(&self, session: &mut Session) -> Result<()> {
        let online = session
            .online
            .take()
            .ok_or_else(|| OverlapError::internal("session is not online"))?;
        self.registry.stop_observation(&online.session_id).await;
        self.persist(session).await
    }

    /// Triggers a manual refresh of all observed sessions
    /// (pull-to-refresh). Returns how many yielded a new snapshot.
    pub async fn fetch_updates(&self) -> usize {
        self.registry.refresh_all().await
    }

    /// Lists all locally stored sessions.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.repository.list_all().await
    }

    /// Deletes a locally stored session, stopping its observation first if
    /// it was online.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        if let Some(session) = self.repository.find_by_id(session_id).await? {
            if let Some(online) = &session.online {
                self.registry.stop_observation(&online.session_id).await;
            }
        }
        self.repository.delete(session_id).await
    }

    /// Saves a session, stamping its update timestamp. The engine persists
    /// on every state transition and successful merge.
    pub async fn persist(&self, session: &mut Session) -> Result<()> {
        session.updated_at = chrono::Utc::now().to_rfc3339();
        self.repository.save(session).await
    }

    /// Resolves the local participant identity, consulting the latest
    /// observed snapshot and fetching one only when none is cached.
    async fn resolve_identity(
        &self,
        session: &mut Session,
        remote_id: &str,
    ) -> Result<Option<String>> {
        if let Some(online) = &session.online {
            if let Some(id) = &online.participant_id {
                if !id.is_empty() {
                    return Ok(Some(id.clone()));
                }
            }
        }
        let hosted = match self.registry.latest(remote_id).await {
            Some(hosted) => hosted,
            None => self.store.fetch_session(remote_id).await?,
        };
        Ok(resolve_participant_id(session, &hosted))
    }

    async fn force_reset(&self, session: &mut Session) -> Result<()> {
        session.reset_to_instructions();
        self.persist(session).await?;
        let _ = self.events.send(SessionEvent::ParticipantRemoved {
            session_id: session.id.clone(),
        });
        Ok(())
    }
}

fn online_details_of(session: &Session) -> Result<(String, String)> {
    session
        .online
        .as_ref()
        .map(|online| (online.session_id.clone(), online.display_name.clone()))
        .ok_or_else(|| OverlapError::internal("session is not online"))
}
