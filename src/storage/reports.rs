//! Build report storage: one JSON file per build.

use std::{fs, io};

use crate::model::{BuildReport, BuildResult, CommandResult};

use super::{Result, Storage, StorageError};

impl Storage {
    /// Writes the report of a build, replacing any earlier one.
    pub fn save_report(&self, job: &str, number: u64, report: &BuildReport) -> Result<()> {
        let dir = self.job_dir(job)?.join("builds");
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(report)?;
        fs::write(dir.join(format!("{number}.json")), json)?;
        Ok(())
    }

    /// Loads the report of a build.
    pub fn load_report(&self, job: &str, number: u64) -> Result<BuildReport> {
        let path = self
            .job_dir(job)?
            .join("builds")
            .join(format!("{number}.json"));
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::ReportNotFound {
                    job: job.to_string(),
                    number,
                });
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    /// Merges a report into the build's stored one, creating it if needed.
    ///
    /// Commands are appended, fixed issues are added unless already listed,
    /// and the stored result only gets worse.
    pub fn merge_report(
        &self,
        job: &str,
        number: u64,
        update: &BuildReport,
    ) -> Result<BuildReport> {
        let mut report = match self.load_report(job, number) {
            Ok(report) => report,
            Err(StorageError::ReportNotFound { .. }) => BuildReport::default(),
            Err(e) => return Err(e),
        };
        report.commands.extend_from_slice(&update.commands);
        for issue in &update.fixed_issues {
            if !report.fixed_issues.contains(issue) {
                report.fixed_issues.push(issue.clone());
            }
        }
        report.result = report.result.max(update.result);
        self.save_report(job, number, &report)?;
        Ok(report)
    }

    /// Appends results to a build's report, creating the report if needed.
    ///
    /// The stored result becomes the worse of the stored and the given one.
    pub fn append_to_report(
        &self,
        job: &str,
        number: u64,
        commands: &[CommandResult],
        result: BuildResult,
    ) -> Result<BuildReport> {
        let update = BuildReport {
            commands: commands.to_vec(),
            fixed_issues: Vec::new(),
            result,
        };
        self.merge_report(job, number, &update)
    }
}
