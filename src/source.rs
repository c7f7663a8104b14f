//! Message sources: where the full text of a change comes from.
//!
//! Some SCMs only hand the pipeline a summary line. For those, the full
//! message is read back from the repository, falling back to what the
//! change entry carries when that fails.

use std::path::PathBuf;
use std::process::Command;

use tracing::warn;

use crate::model::ChangeEntry;

/// Produces the message text to scan for a change.
pub trait MessageSource {
    fn message(&self, entry: &ChangeEntry) -> String;
}

/// Uses the message as recorded in the change entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryMessage;

impl MessageSource for EntryMessage {
    fn message(&self, entry: &ChangeEntry) -> String {
        entry.message.clone()
    }
}

/// Reads the full commit message from a git repository.
#[derive(Debug, Clone)]
pub struct GitMessage {
    repository: PathBuf,
}

impl GitMessage {
    pub fn new(repository: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
        }
    }

    fn full_message(&self, revision: &str) -> Result<String, String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repository)
            .args(["show", "-s", "--format=%B", revision, "--"])
            .output()
            .map_err(|e| format!("failed to run git: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git show {revision} failed: {}", stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl MessageSource for GitMessage {
    fn message(&self, entry: &ChangeEntry) -> String {
        match self.full_message(&entry.revision) {
            Ok(message) => message,
            Err(e) => {
                warn!(revision = %entry.revision, "using recorded message: {e}");
                entry.message.clone()
            }
        }
    }
}
