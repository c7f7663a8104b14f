//! Build commands: dispatch, update-build, report-failure.

use std::fs;
use std::path::{Path, PathBuf};

use crate::build_update::{BuildUpdate, BuildUpdater};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::expand::Environment;
use crate::failure_issue::{FailureIssue, FailureReporter};
use crate::model::{Build, ChangeEntry};
use crate::source::{EntryMessage, GitMessage, MessageSource};
use crate::storage::{Storage, StorageError};
use crate::tracker::BridgeTracker;

use super::format::{format_command, format_report};
use super::{BuildArgs, ScmArg};

impl BuildArgs {
    fn to_build(&self) -> Build {
        Build {
            job: self.job.clone(),
            number: self.number,
            url: self.url.clone(),
            result: self.result.to_domain(),
        }
    }
}

pub(super) fn cmd_dispatch(
    config: &Config,
    storage: &Storage,
    args: &BuildArgs,
    changes: &Path,
    scm: ScmArg,
    repo: &Path,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let entries = read_changes(changes)?;
    let mut build = args.to_build();

    let tracker = BridgeTracker::new(&config.tracker);
    let revisions = storage.processed_revisions();
    let env = Environment::from_process();
    let git;
    let source: &dyn MessageSource = match scm {
        ScmArg::Entry => &EntryMessage,
        ScmArg::Git => {
            git = GitMessage::new(repo);
            &git
        }
    };

    let dispatcher = Dispatcher::new(&config.site, &tracker, storage, &revisions, source, &env);
    let report = dispatcher.dispatch(&mut build, &entries);

    let report = storage
        .merge_report(&build.job, build.number, &report)
        .map_err(|e| format!("failed to save build report: {e}"))?;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("failed to serialize report: {e}"))?;
    match out {
        Some(path) => {
            fs::write(&path, &json)
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            eprintln!("Report → {}", path.display());
        }
        None => println!("{json}"),
    }
    eprintln!("{}", format_report(&report));
    Ok(())
}

pub(super) fn cmd_update_build(
    config: &Config,
    storage: &Storage,
    args: &BuildArgs,
    update: &BuildUpdate,
) -> Result<(), String> {
    let mut build = args.to_build();
    let report = match storage.load_report(&build.job, build.number) {
        Ok(report) => report,
        Err(StorageError::ReportNotFound { .. }) => {
            return Err(format!(
                "no report for build {} #{}; run `ytlink dispatch` first",
                build.job, build.number
            ));
        }
        Err(e) => return Err(format!("failed to load build report: {e}")),
    };
    build.result = build.result.max(report.result);

    let tracker = BridgeTracker::new(&config.tracker);
    let env = Environment::from_process();
    let updater = BuildUpdater::new(&config.site, &tracker, &env);
    let results = updater.update(&mut build, &report.fixed_issues, update);

    for result in &results {
        eprintln!("{}", format_command(result));
    }
    let report = storage
        .append_to_report(&build.job, build.number, &results, build.result)
        .map_err(|e| format!("failed to save build report: {e}"))?;
    eprintln!("{}", format_report(&report));
    Ok(())
}

pub(super) fn cmd_report_failure(
    config: &Config,
    storage: &Storage,
    args: &BuildArgs,
    issue: &FailureIssue,
) -> Result<(), String> {
    let mut build = args.to_build();
    match storage.load_report(&build.job, build.number) {
        Ok(report) => build.result = build.result.max(report.result),
        Err(StorageError::ReportNotFound { .. }) => {}
        Err(e) => return Err(format!("failed to load build report: {e}")),
    }

    let tracker = BridgeTracker::new(&config.tracker);
    let env = Environment::from_process();
    let reporter = FailureReporter::new(&config.site, &tracker, &env);
    let Some(result) = reporter.report(&build, issue) else {
        eprintln!("No issue created");
        return Ok(());
    };

    eprintln!("{}", format_command(&result));
    if let Some(id) = result.issue_id.as_deref() {
        println!("{id}");
    }
    storage
        .append_to_report(&build.job, build.number, &[result], build.result)
        .map_err(|e| format!("failed to save build report: {e}"))?;
    Ok(())
}

/// Read the change file: a JSON array of change entries.
fn read_changes(path: &Path) -> Result<Vec<ChangeEntry>, String> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&json).map_err(|e| format!("invalid change file {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::cli::ResultArg;
    use crate::model::BuildResult;

    #[test]
    fn reads_change_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("changes.json");
        fs::write(
            &path,
            r##"[
                {"revision": "c1", "author": {"name": "dev", "email": "dev@example.com"},
                 "message": "#TP1-1 Fixed", "paths": ["src/lib.rs"]},
                {"revision": "c2", "author": {"name": "dev"}}
            ]"##,
        )
        .unwrap();

        let entries = read_changes(&path).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "#TP1-1 Fixed");
        assert_eq!(entries[1].message, "");
        assert_eq!(entries[1].author.email, None);
    }

    #[test]
    fn invalid_change_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("changes.json");
        fs::write(&path, "{}").unwrap();

        let err = read_changes(&path).unwrap_err();
        assert!(err.contains("invalid change file"));
    }

    #[test]
    fn build_args_map_to_build() {
        let args = BuildArgs {
            job: "app".into(),
            number: 5,
            url: "http://ci/5/".into(),
            result: ResultArg::Failure,
        };
        let build = args.to_build();
        assert_eq!(build.job, "app");
        assert_eq!(build.result, BuildResult::Failure);
    }

    #[test]
    fn update_build_requires_dispatch_report() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path()).unwrap();
        let args = BuildArgs {
            job: "app".into(),
            number: 5,
            url: String::new(),
            result: ResultArg::Success,
        };

        let err = cmd_update_build(&Config::default(), &storage, &args, &BuildUpdate::default())
            .unwrap_err();
        assert!(err.contains("run `ytlink dispatch` first"));
    }
}
