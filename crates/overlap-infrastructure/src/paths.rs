//! Default storage locations.

use std::path::PathBuf;

use overlap_core::error::{OverlapError, Result};

/// Path resolution for Overlap's on-disk data.
pub struct OverlapPaths;

impl OverlapPaths {
    /// Returns the default data directory (`~/.overlap`).
    ///
    /// # Errors
    ///
    /// Fails if the home directory cannot be determined.
    pub fn data_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".overlap"))
            .ok_or_else(|| OverlapError::data_access("failed to determine home directory"))
    }
}
