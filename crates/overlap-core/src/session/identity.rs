//! Participant identity resolution.
//!
//! Online sessions remember only the display name a device joined under;
//! the stable participant ID is resolved lazily against the remote roster
//! and cached on the session model. Resolution must run before every remote
//! mutation: an unresolved identity means the participant was removed from
//! the session and forces the reset transition.

use super::hosted::HostedSession;
use super::model::Session;

/// Resolves the local device's participant ID for an online session.
///
/// Returns the cached ID when present and non-empty. Otherwise looks the
/// remembered display name up in the snapshot roster with a
/// case-insensitive exact match, caching the ID on success. Returns `None`
/// when the session is not online or the display name is no longer in the
/// roster.
pub fn resolve_participant_id(session: &mut Session, hosted: &HostedSession) -> Option<String> {
    let online = session.online.as_mut()?;
    if let Some(id) = &online.participant_id {
        if !id.is_empty() {
            return Some(id.clone());
        }
    }
    let resolved = hosted.participant_id_for(&online.display_name)?;
    online.participant_id = Some(resolved.clone());
    Some(resolved)
}
