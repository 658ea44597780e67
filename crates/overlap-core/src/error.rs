//! Error types for the Overlap engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionState;

/// A shared error type for the Overlap session engine.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum OverlapError {
    /// The local participant identity is no longer resolvable against the
    /// session roster. Recoverable by resetting the session and re-joining.
    #[error("Participant not in session: '{name}'")]
    ParticipantNotInSession { name: String },

    /// The remote session record is missing or has been deleted.
    #[error("Session not found: '{id}'")]
    SessionNotFound { id: String },

    /// Transient transport failure talking to the remote record store.
    #[error("Network unavailable: {message}")]
    Network { message: String },

    /// Malformed or unrecognized invite token.
    #[error("Invalid invite: {reason}")]
    InvalidInvite { reason: String },

    /// A state machine operation was attempted from the wrong state.
    #[error("Invalid transition from {state:?}: {reason}")]
    InvalidTransition {
        state: SessionState,
        reason: String,
    },

    /// A participant display name is already taken within the session.
    #[error("Participant '{name}' is already in the session")]
    DuplicateParticipant { name: String },

    /// Data access error (repository/storage layer)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", "TOML", etc.
        message: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OverlapError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a ParticipantNotInSession error
    pub fn participant_not_in_session(name: impl Into<String>) -> Self {
        Self::ParticipantNotInSession { name: name.into() }
    }

    /// Creates a SessionNotFound error
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound { id: id.into() }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates an InvalidInvite error
    pub fn invalid_invite(reason: impl Into<String>) -> Self {
        Self::InvalidInvite {
            reason: reason.into(),
        }
    }

    /// Creates an InvalidTransition error
    pub fn invalid_transition(state: SessionState, reason: impl Into<String>) -> Self {
        Self::InvalidTransition {
            state,
            reason: reason.into(),
        }
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a SessionNotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound { .. })
    }

    /// Check if this is an identity resolution failure
    pub fn is_identity_failure(&self) -> bool {
        matches!(self, Self::ParticipantNotInSession { .. })
    }

    /// Check if this failure is transient and worth retrying.
    ///
    /// Only transport failures qualify. Observation refresh retries these
    /// with backoff; answer submission never retries them internally.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for OverlapError {
    fn from(err: std::io::Error) -> Self {
        Self::DataAccess(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for OverlapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (boundary crossings only)
impl From<anyhow::Error> for OverlapError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Conversion from String (for error messages)
impl From<String> for OverlapError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, OverlapError>`.
pub type Result<T> = std::result::Result<T, OverlapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification_covers_only_network_failures() {
        assert!(OverlapError::network("connection reset").is_transient());
        assert!(!OverlapError::session_not_found("abc").is_transient());
        assert!(!OverlapError::participant_not_in_session("Alice").is_transient());
    }

    #[test]
    fn io_errors_convert_to_data_access() {
        let err: OverlapError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, OverlapError::DataAccess(_)));
    }
}
