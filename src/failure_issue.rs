//! Open a tracker issue when a build fails.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SiteConfig;
use crate::expand::Environment;
use crate::model::{Build, BuildResult, CommandResult};
use crate::tracker::{NewIssue, Tracker};

/// Which build results warrant an issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Threshold {
    /// Only failed builds.
    #[default]
    Failure,
    /// Failed and unstable builds.
    FailureOrUnstable,
}

impl Threshold {
    pub fn is_reached(self, result: BuildResult) -> bool {
        match self {
            Self::Failure => result == BuildResult::Failure,
            Self::FailureOrUnstable => result >= BuildResult::Unstable,
        }
    }
}

/// The issue to open for a failed build.
#[derive(Debug, Clone, Default)]
pub struct FailureIssue {
    /// Short name of the project the issue is created in.
    pub project: String,

    /// Defaults to `Build failure in build <number>`.
    pub summary: Option<String>,

    /// Defaults to the build URL.
    pub description: Option<String>,

    /// Applied to the new issue, e.g. `Assignee me Priority Critical`.
    pub command: Option<String>,

    pub threshold: Threshold,

    /// Build log to attach.
    pub build_log: Option<PathBuf>,
}

/// Reports failed builds as tracker issues.
pub struct FailureReporter<'a> {
    site: &'a SiteConfig,
    tracker: &'a dyn Tracker,
    env: &'a Environment,
}

impl<'a> FailureReporter<'a> {
    pub fn new(site: &'a SiteConfig, tracker: &'a dyn Tracker, env: &'a Environment) -> Self {
        Self { site, tracker, env }
    }

    /// Creates the issue if the build result reaches the threshold.
    ///
    /// Returns `None` when nothing was attempted: the build was good enough
    /// or the tracker login failed.
    pub fn report(&self, build: &Build, issue: &FailureIssue) -> Option<CommandResult> {
        if !issue.threshold.is_reached(build.result) {
            info!(result = ?build.result, "build result below threshold, no issue created");
            return None;
        }

        let Some(user) = self.tracker.login() else {
            warn!(site = %self.site.name, "could not log in to tracker, no issue created");
            return None;
        };

        let summary = self
            .expanded(issue.summary.as_deref())
            .unwrap_or_else(|| format!("Build failure in build {}", build.number));
        let description = self
            .expanded(issue.description.as_deref())
            .unwrap_or_else(|| build.url.clone());
        let command = self.expanded(issue.command.as_deref());

        let result = self.tracker.create_issue(
            &user,
            &NewIssue {
                site_name: &self.site.name,
                project: &issue.project,
                summary: &summary,
                description: &description,
                command: command.as_deref(),
                attachment: issue.build_log.as_deref(),
            },
        );
        if result.is_ok() {
            info!(
                issue = result.issue_id.as_deref().unwrap_or(""),
                project = %issue.project,
                "created issue for failed build"
            );
        } else {
            warn!(
                project = %issue.project,
                status = ?result.status,
                "could not create issue for failed build"
            );
        }
        Some(result)
    }

    /// The expanded text, or `None` when unset or blank.
    fn expanded(&self, text: Option<&str>) -> Option<String> {
        text.map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| self.env.expand(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::CommandStatus;
    use crate::tracker::fake::FakeTracker;

    fn build(result: BuildResult) -> Build {
        Build {
            job: "app".into(),
            number: 7,
            url: "http://ci/job/app/7/".into(),
            result,
        }
    }

    fn issue(threshold: Threshold) -> FailureIssue {
        FailureIssue {
            project: "TP1".into(),
            threshold,
            ..FailureIssue::default()
        }
    }

    #[test]
    fn threshold_gates_results() {
        assert!(!Threshold::Failure.is_reached(BuildResult::Success));
        assert!(!Threshold::Failure.is_reached(BuildResult::Unstable));
        assert!(Threshold::Failure.is_reached(BuildResult::Failure));

        assert!(!Threshold::FailureOrUnstable.is_reached(BuildResult::Success));
        assert!(Threshold::FailureOrUnstable.is_reached(BuildResult::Unstable));
        assert!(Threshold::FailureOrUnstable.is_reached(BuildResult::Failure));
    }

    #[test]
    fn failed_build_gets_default_summary_and_description() {
        let tracker = FakeTracker::logged_in(&["TP1"]);
        let site = SiteConfig::default();
        let env = Environment::default();
        let reporter = FailureReporter::new(&site, &tracker, &env);

        let result = reporter
            .report(&build(BuildResult::Failure), &issue(Threshold::Failure))
            .unwrap();

        assert_eq!(result.status, CommandStatus::Ok);
        assert_eq!(result.issue_id.as_deref(), Some("TP1-1"));
        assert_eq!(result.command, "[Create issue]");
        assert_eq!(
            *tracker.created.borrow(),
            vec![(
                "TP1".to_string(),
                "Build failure in build 7".to_string(),
                "http://ci/job/app/7/".to_string(),
            )]
        );
    }

    #[test]
    fn unstable_build_below_failure_threshold() {
        let tracker = FakeTracker::logged_in(&["TP1"]);
        let site = SiteConfig::default();
        let env = Environment::default();
        let reporter = FailureReporter::new(&site, &tracker, &env);

        let result = reporter.report(&build(BuildResult::Unstable), &issue(Threshold::Failure));

        assert!(result.is_none());
        assert!(tracker.created.borrow().is_empty());
    }

    #[test]
    fn summary_description_and_command_are_expanded() {
        let tracker = FakeTracker::logged_in(&["TP1"]);
        let site = SiteConfig::default();
        let env = Environment::new([("JOB_NAME".to_string(), "app".to_string())]);
        let reporter = FailureReporter::new(&site, &tracker, &env);
        let failure = FailureIssue {
            summary: Some("$JOB_NAME is broken".into()),
            description: Some("See ${JOB_NAME}".into()),
            command: Some("Subsystem $JOB_NAME".into()),
            ..issue(Threshold::FailureOrUnstable)
        };

        let result = reporter
            .report(&build(BuildResult::Unstable), &failure)
            .unwrap();

        assert_eq!(result.command, "Subsystem app");
        let created = tracker.created.borrow();
        assert_eq!(created[0].1, "app is broken");
        assert_eq!(created[0].2, "See app");
    }

    #[test]
    fn failed_login_creates_nothing() {
        let tracker = FakeTracker::default();
        let site = SiteConfig::default();
        let env = Environment::default();
        let reporter = FailureReporter::new(&site, &tracker, &env);

        let result = reporter.report(&build(BuildResult::Failure), &issue(Threshold::Failure));

        assert!(result.is_none());
    }
}
