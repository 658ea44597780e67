//! Invite tokens for joining online sessions.
//!
//! An invite is an opaque token embedded in a shareable link. It carries the
//! remote session ID plus an optional joining hint, encoded as URL-safe
//! base64 over a small JSON payload. The token has no lifecycle of its own;
//! it is produced and parsed by the record store boundary.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// Link scheme prefix for shareable invite links.
pub const INVITE_LINK_PREFIX: &str = "overlap://join/";

/// An invitation to join an online session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    /// Remote session record identifier.
    pub session_id: String,
    /// Optional hint shown to the joining device (e.g. the host's name).
    #[serde(default)]
    pub hint: Option<String>,
}

impl Invite {
    /// Creates an invite for the given remote session.
    pub fn new(session_id: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            session_id: session_id.into(),
            hint,
        }
    }

    /// Encodes this invite into a shareable link.
    pub fn to_link(&self) -> String {
        let payload = serde_json::json!({
            "session_id": self.session_id,
            "hint": self.hint,
        })
        .to_string();
        format!("{}{}", INVITE_LINK_PREFIX, URL_SAFE_NO_PAD.encode(payload))
    }

    /// Parses a raw link back into an invite.
    ///
    /// Returns `None` for unrecognized link formats, undecodable tokens, and
    /// payloads without a session ID.
    pub fn parse(raw_link: &str) -> Option<Self> {
        let token = raw_link.trim().strip_prefix(INVITE_LINK_PREFIX)?;
        let bytes = URL_SAFE_NO_PAD.decode(token.as_bytes()).ok()?;
        let invite: Invite = serde_json::from_slice(&bytes).ok()?;
        if invite.session_id.is_empty() {
            return None;
        }
        Some(invite)
    }
}
