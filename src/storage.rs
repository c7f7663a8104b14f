//! Local persistence for processed revisions, project caches and build reports.
//!
//! Everything lives under the storage root:
//!
//! ```text
//! <root>/
//!   config.toml              # Configuration
//!   youtrack-processed       # Revisions already dispatched, one per line
//!   jobs/<job>/
//!     project-names.json     # Short names from the last run that reached the tracker
//!     builds/<number>.json   # Build report
//! ```

mod projects;
mod reports;
mod revisions;

use std::{env, fs, io, path::PathBuf};

pub use revisions::ProcessedRevisions;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no report for build {job} #{number}")]
    ReportNotFound { job: String, number: u64 },

    #[error("invalid job name: {0:?}")]
    InvalidJobName(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Name of the processed-revisions file under the root.
const PROCESSED_FILE: &str = "youtrack-processed";

/// Local file-based storage.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Creates a new storage instance rooted at the given directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the default storage root: `$YTLINK_HOME`, else `~/.ytlink/`.
    pub fn default_root() -> Option<PathBuf> {
        if let Ok(home) = env::var("YTLINK_HOME")
            && !home.is_empty()
        {
            return Some(PathBuf::from(home));
        }
        dirs::home_dir().map(|h| h.join(".ytlink"))
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Opens the processed-revisions store.
    ///
    /// Open it once per process and share it between dispatches.
    pub fn processed_revisions(&self) -> ProcessedRevisions {
        ProcessedRevisions::open(self.root.join(PROCESSED_FILE))
    }

    fn job_dir(&self, job: &str) -> Result<PathBuf> {
        let valid = !job.is_empty()
            && job != "."
            && job != ".."
            && !job.contains(['/', '\\'])
            && !job.contains('\0');
        if !valid {
            return Err(StorageError::InvalidJobName(job.to_string()));
        }
        Ok(self.root.join("jobs").join(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn creates_root_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("root");
        let storage = Storage::new(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(storage.root(), root);
    }

    #[test]
    fn rejects_job_names_that_escape_the_root() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).unwrap();
        for job in ["", ".", "..", "a/b", "a\\b"] {
            let err = storage.job_dir(job).unwrap_err();
            assert!(matches!(err, StorageError::InvalidJobName(_)), "{job}");
        }
        assert!(storage.job_dir("my-app").is_ok());
    }
}
