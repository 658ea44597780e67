//! Remote session store boundary.
//!
//! Defines the interface to the remote record store that holds the
//! authoritative `HostedSession` snapshot for every online session. The
//! engine only ever talks to this trait; concrete transports live in the
//! infrastructure layer.

use async_trait::async_trait;

use crate::error::Result;
use crate::invite::Invite;
use crate::session::{Answer, HostedSession};

/// An abstract store of hosted session records.
///
/// Implementations hold one authoritative record per session, replaced
/// wholesale on every mutation. Every mutating call returns the resulting
/// fresh snapshot so callers can merge it immediately.
///
/// # Implementation Notes
///
/// - `submit_answer` must be idempotent per (participant, question index):
///   retrying a submission must not double-count.
/// - Revisions must increase monotonically with every effective mutation.
#[async_trait]
pub trait RemoteSessionStore: Send + Sync {
    /// Creates a new hosted session with the calling device as host.
    ///
    /// Registers the host's display name into the roster and returns the
    /// new record's ID together with its initial snapshot.
    async fn create_session(
        &self,
        title: &str,
        questions: &[String],
        host_display_name: &str,
    ) -> Result<(String, HostedSession)>;

    /// Fetches the current snapshot for a session.
    ///
    /// # Errors
    ///
    /// Fails with `SessionNotFound` if the record is missing or deleted.
    async fn fetch_session(&self, session_id: &str) -> Result<HostedSession>;

    /// Records one participant's answer to one question.
    ///
    /// # Errors
    ///
    /// Fails with `ParticipantNotInSession` if the participant ID is not in
    /// the roster, and `SessionNotFound` if the record is gone.
    async fn submit_answer(
        &self,
        session_id: &str,
        participant_id: &str,
        question_index: usize,
        answer: Answer,
    ) -> Result<HostedSession>;

    /// Joins a session through an invite, registering the joining device's
    /// display name into the roster.
    ///
    /// Returns the record ID and the snapshot including the new roster
    /// entry. Joining again under a name already in the roster
    /// (case-insensitive) reuses the existing participant identity.
    async fn join_session(
        &self,
        invite: &Invite,
        display_name: &str,
    ) -> Result<(String, HostedSession)>;

    /// Parses a raw shareable link into an invite.
    ///
    /// Returns `None` for unrecognized link formats.
    fn parse_invite(&self, raw_link: &str) -> Option<Invite>;

    /// Produces the shareable invite link for a session.
    fn invite_link(&self, session_id: &str, hint: Option<&str>) -> String;
}
