//! Session repository trait.
//!
//! Defines the local persistence boundary for sessions. The engine saves a
//! session on every state transition and every successful snapshot merge;
//! the storage format is owned entirely by the implementation.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::Session;

/// An abstract repository for managing session persistence.
///
/// This decouples the engine from the specific storage mechanism (JSON
/// files, a database, ...). Implementations are free to choose their
/// layout; the engine only requires a "save now" hook.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: Session found
    /// - `Ok(None)`: Session not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>>;

    /// Saves a session to storage.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Deletes a session from storage. Deleting a missing session is not an
    /// error.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists all stored sessions.
    async fn list_all(&self) -> Result<Vec<Session>>;
}
