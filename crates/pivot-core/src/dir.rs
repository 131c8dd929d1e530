//! Project-local data directory
//!
//! [`PivotDir`] manages `.pivot/`, which holds the deployment manifest.

use std::path::{Path, PathBuf};

/// Manages the `.pivot/` directory.
///
/// Commit it to version control to share deployments across machines.
#[derive(Debug, Clone)]
pub struct PivotDir {
    path: PathBuf,
}

impl PivotDir {
    pub const NAME: &str = ".pivot";

    /// File name of the SQLite manifest
    pub const DATABASE: &str = "pivot.db";

    /// `.pivot/` in the current directory
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(Self::NAME),
        }
    }

    /// `.pivot/` under the given project root
    pub fn in_project<P: AsRef<Path>>(root: P) -> Self {
        Self {
            path: root.as_ref().join(Self::NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn database_path(&self) -> PathBuf {
        self.path.join(Self::DATABASE)
    }

    /// sqlx connection URL for the manifest
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.database_path().display())
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Create the directory if it doesn't exist
    pub fn create(&self) -> std::io::Result<()> {
        if !self.exists() {
            std::fs::create_dir_all(&self.path)?;
        }
        Ok(())
    }
}

impl Default for PivotDir {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Path> for PivotDir {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
