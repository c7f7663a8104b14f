//! Project short-name cache: the registry of a job's last run that reached the tracker.

use std::{fs, io};

use crate::model::ProjectRegistry;

use super::{Result, Storage};

const PROJECTS_FILE: &str = "project-names.json";

impl Storage {
    /// Remembers the job's project short names for runs that can't reach the tracker.
    pub fn save_project_names(&self, job: &str, registry: &ProjectRegistry) -> Result<()> {
        let dir = self.job_dir(job)?;
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(&registry.short_names())?;
        fs::write(dir.join(PROJECTS_FILE), json)?;
        Ok(())
    }

    /// Loads the cached registry. Empty if the job never reached the tracker.
    pub fn load_project_names(&self, job: &str) -> Result<ProjectRegistry> {
        let path = self.job_dir(job)?.join(PROJECTS_FILE);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(ProjectRegistry::default());
            }
            Err(e) => return Err(e.into()),
        };
        let names: Vec<String> = serde_json::from_str(&json)?;
        Ok(ProjectRegistry::from_short_names(&names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::storage::StorageError;

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).unwrap();
        (dir, storage)
    }

    #[test]
    fn save_and_load_keeps_order() {
        let (_dir, storage) = test_storage();
        let registry = ProjectRegistry::from_short_names(&["PYAT", "AT", "TP1"]);

        storage.save_project_names("app", &registry).unwrap();
        let loaded = storage.load_project_names("app").unwrap();

        assert_eq!(loaded.short_names(), vec!["PYAT", "AT", "TP1"]);
    }

    #[test]
    fn missing_cache_is_empty() {
        let (_dir, storage) = test_storage();
        assert!(storage.load_project_names("never-ran").unwrap().is_empty());
    }

    #[test]
    fn caches_are_per_job() {
        let (_dir, storage) = test_storage();
        storage
            .save_project_names("a", &ProjectRegistry::from_short_names(&["TP1"]))
            .unwrap();
        storage
            .save_project_names("b", &ProjectRegistry::from_short_names(&["TP2"]))
            .unwrap();

        assert_eq!(storage.load_project_names("a").unwrap().short_names(), vec!["TP1"]);
        assert_eq!(storage.load_project_names("b").unwrap().short_names(), vec!["TP2"]);
    }

    #[test]
    fn corrupt_cache_is_an_error() {
        let (dir, storage) = test_storage();
        let job_dir = dir.path().join("jobs").join("app");
        fs::create_dir_all(&job_dir).unwrap();
        fs::write(job_dir.join(PROJECTS_FILE), "{not json").unwrap();

        let err = storage.load_project_names("app").unwrap_err();
        assert!(matches!(err, StorageError::Json(_)));
    }
}
