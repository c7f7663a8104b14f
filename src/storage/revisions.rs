//! Processed revisions: which revisions already had their commands applied.
//!
//! Backed by an append-only text file, one revision id per line. Builds run
//! as separate processes, so every check and every addition takes an
//! exclusive lock on the file and re-reads it first. A revision one build
//! adds is seen by the next check of any other. A dispatch claims each
//! revision, keeping the lock while its commands are applied.
//!
//! Faults are logged and never fatal: an unreadable file behaves as an empty
//! set, a failed append still remembers the revision for this process.

use std::collections::HashSet;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fs2::FileExt;
use tracing::{debug, error};

/// The set of revision ids already dispatched.
///
/// `Sync`: threads of one process share an instance through the mutex, other
/// processes are kept out by the file lock.
#[derive(Debug)]
pub struct ProcessedRevisions {
    path: PathBuf,
    /// Everything read from the file so far, plus additions that failed to persist.
    ids: Mutex<HashSet<String>>,
}

impl ProcessedRevisions {
    /// Opens the store at `path`, creating an empty file if none exists.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self {
            path: path.into(),
            ids: Mutex::new(HashSet::new()),
        };
        {
            let mut ids = store.lock();
            let _file = store.sync(&mut ids);
            debug!(path = %store.path.display(), count = ids.len(), "loaded processed revisions");
        }
        store
    }

    pub fn is_processed(&self, revision: &str) -> bool {
        let mut ids = self.lock();
        let _file = self.sync(&mut ids);
        ids.contains(revision)
    }

    /// Records a revision as processed and appends it to the file.
    ///
    /// A revision another process recorded in the meantime isn't appended twice.
    pub fn add_processed(&self, revision: &str) {
        if let Some(claim) = self.claim(revision) {
            claim.record();
        }
    }

    /// Holds the store for an unprocessed revision. `None` if it was processed.
    ///
    /// Until the claim is dropped no other thread or process can check or add
    /// revisions, so the revision's commands are applied by one build only.
    pub fn claim(&self, revision: &str) -> Option<RevisionClaim<'_>> {
        let mut ids = self.lock();
        let file = self.sync(&mut ids);
        if ids.contains(revision) {
            return None;
        }
        Some(RevisionClaim {
            path: &self.path,
            ids,
            file,
            revision: revision.to_string(),
        })
    }

    /// All processed revisions, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut ids = self.lock();
        let _file = self.sync(&mut ids);
        let mut list: Vec<String> = ids.iter().cloned().collect();
        list.sort();
        list
    }

    /// Locks the file and merges its contents into `ids`.
    ///
    /// The returned file holds the lock until dropped. `None` if the file
    /// can't be locked or read; the fault is logged.
    fn sync(&self, ids: &mut HashSet<String>) -> Option<fs::File> {
        match lock_and_read(&self.path, ids) {
            Ok(file) => Some(file),
            Err(e) => {
                error!(path = %self.path.display(), "could not read processed revisions: {e}");
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set is never left half-updated, so a poisoned lock is still usable.
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An unprocessed revision, held exclusively. See [`ProcessedRevisions::claim`].
pub struct RevisionClaim<'a> {
    path: &'a Path,
    ids: MutexGuard<'a, HashSet<String>>,
    /// The locked file; `None` when it couldn't be read.
    file: Option<fs::File>,
    revision: String,
}

impl RevisionClaim<'_> {
    /// Marks the revision processed and appends it to the file.
    pub fn record(mut self) {
        self.ids.insert(self.revision.clone());
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let mut line = self.revision.clone();
        line.push('\n');
        if let Err(e) = file.write_all(line.as_bytes()) {
            error!(
                path = %self.path.display(),
                revision = %self.revision,
                "could not record processed revision: {e}"
            );
        }
    }
}

fn lock_and_read(path: &Path, ids: &mut HashSet<String>) -> io::Result<fs::File> {
    let file = fs::OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    file.lock_exclusive()?;
    for line in io::BufReader::new(&file).lines() {
        let line = line?;
        let id = line.trim();
        if !id.is_empty() {
            ids.insert(id.to_string());
        }
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;

    use tempfile::TempDir;

    fn store_path(dir: &TempDir) -> PathBuf {
        dir.path().join("youtrack-processed")
    }

    #[test]
    fn open_creates_empty_file() {
        let dir = TempDir::new().unwrap();
        let store = ProcessedRevisions::open(store_path(&dir));
        assert!(store.list().is_empty());
        assert!(store_path(&dir).is_file());
    }

    #[test]
    fn added_revision_is_processed() {
        let dir = TempDir::new().unwrap();
        let store = ProcessedRevisions::open(store_path(&dir));

        assert!(!store.is_processed("abc"));
        store.add_processed("abc");
        assert!(store.is_processed("abc"));
    }

    #[test]
    fn revisions_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let store = ProcessedRevisions::open(store_path(&dir));
        store.add_processed("abc");
        store.add_processed("def");
        drop(store);

        let reopened = ProcessedRevisions::open(store_path(&dir));
        assert_eq!(reopened.list(), vec!["abc", "def"]);
    }

    #[test]
    fn file_is_append_only_without_duplicates() {
        let dir = TempDir::new().unwrap();
        let store = ProcessedRevisions::open(store_path(&dir));
        store.add_processed("abc");
        store.add_processed("abc");
        store.add_processed("def");

        let contents = fs::read_to_string(store_path(&dir)).unwrap();
        assert_eq!(contents, "abc\ndef\n");
    }

    #[test]
    fn blank_lines_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(store_path(&dir), "abc\n\n  \ndef\n").unwrap();
        let store = ProcessedRevisions::open(store_path(&dir));
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn unreadable_file_is_an_empty_set() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be can't be read as lines.
        fs::create_dir(store_path(&dir)).unwrap();
        let store = ProcessedRevisions::open(store_path(&dir));
        assert!(store.list().is_empty());

        // Appending fails too, but the revision is still remembered.
        store.add_processed("abc");
        assert!(store.is_processed("abc"));
    }

    #[test]
    fn concurrent_additions_are_all_recorded() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ProcessedRevisions::open(store_path(&dir)));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..25 {
                        store.add_processed(&format!("rev-{t}-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.list().len(), 200);
        let reopened = ProcessedRevisions::open(store_path(&dir));
        assert_eq!(reopened.list().len(), 200);
    }

    #[test]
    fn revision_added_by_another_instance_is_processed() {
        let dir = TempDir::new().unwrap();
        let build_a = ProcessedRevisions::open(store_path(&dir));
        let build_b = ProcessedRevisions::open(store_path(&dir));

        build_a.add_processed("c1");

        assert!(build_b.is_processed("c1"));
        build_b.add_processed("c1");
        let contents = fs::read_to_string(store_path(&dir)).unwrap();
        assert_eq!(contents, "c1\n");
    }

    #[test]
    fn claim_is_refused_once_another_instance_recorded() {
        let dir = TempDir::new().unwrap();
        let build_a = ProcessedRevisions::open(store_path(&dir));
        let build_b = ProcessedRevisions::open(store_path(&dir));

        let claim = build_a.claim("c1").unwrap();
        claim.record();

        assert!(build_b.claim("c1").is_none());
        assert!(build_a.claim("c1").is_none());
    }

    #[test]
    fn dropped_claim_leaves_revision_unprocessed() {
        let dir = TempDir::new().unwrap();
        let store = ProcessedRevisions::open(store_path(&dir));

        drop(store.claim("c1").unwrap());

        assert!(!store.is_processed("c1"));
        assert_eq!(fs::read_to_string(store_path(&dir)).unwrap(), "");
    }

    #[test]
    fn instances_racing_on_one_file_never_duplicate() {
        let dir = TempDir::new().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = store_path(&dir);
                thread::spawn(move || {
                    let store = ProcessedRevisions::open(path);
                    for i in 0..25 {
                        store.add_processed(&format!("rev-{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = fs::read_to_string(store_path(&dir)).unwrap();
        assert_eq!(contents.lines().count(), 25);
        assert_eq!(ProcessedRevisions::open(store_path(&dir)).list().len(), 25);
    }
}
