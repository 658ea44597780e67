//! JSON-file SessionRepository implementation.
//!
//! Stores each session as an individual JSON document:
//!
//! ```text
//! base_dir/
//! └── sessions/
//!     ├── <session-id-1>.json
//!     └── <session-id-2>.json
//! ```
//!
//! JSON rather than TOML because answer slots are optional values inside
//! arrays, which TOML cannot represent.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use overlap_core::error::Result;
use overlap_core::repository::SessionRepository;
use overlap_core::session::Session;

use crate::paths::OverlapPaths;

/// A repository implementation storing session data in JSON files.
pub struct JsonSessionRepository {
    base_dir: PathBuf,
}

impl JsonSessionRepository {
    /// Creates a new `JsonSessionRepository` with the specified base
    /// directory, creating the directory structure if needed.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(base_dir.join("sessions")).await?;
        Ok(Self { base_dir })
    }

    /// Creates a repository at the default location (`~/.overlap`).
    pub async fn default_location() -> Result<Self> {
        Self::new(OverlapPaths::data_dir()?).await
    }

    /// Returns the file path for a given session ID.
    fn session_file_path(&self, session_id: &str) -> PathBuf {
        self.base_dir
            .join("sessions")
            .join(format!("{}.json", session_id))
    }

    fn sessions_dir(&self) -> PathBuf {
        self.base_dir.join("sessions")
    }
}

#[async_trait]
impl SessionRepository for JsonSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        let path = self.session_file_path(session_id);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let session: Session = serde_json::from_str(&contents)?;
        Ok(Some(session))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let contents = serde_json::to_string_pretty(session)?;
        fs::write(self.session_file_path(&session.id), contents).await?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        match fs::remove_file(self.session_file_path(session_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let mut sessions = Vec::new();
        let mut entries = fs::read_dir(self.sessions_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read_to_string(&path).await?;
            match serde_json::from_str::<Session>(&contents) {
                Ok(session) => sessions.push(session),
                Err(err) => {
                    // A corrupt file should not take the whole list down.
                    tracing::warn!(
                        target: "storage",
                        "Skipping unreadable session file {}: {}",
                        path.display(),
                        err
                    );
                }
            }
        }
        Ok(sessions)
    }
}
