//! Post-build updates: record the build in bundles and on fixed issues.

use tracing::{info, warn};

use crate::config::SiteConfig;
use crate::expand::Environment;
use crate::model::{Build, BuildResult, CommandResult, IssueRef, User};
use crate::tracker::{AddBuild, ApplyCommand, Tracker};

/// Applied to every fixed issue unless configured otherwise.
pub const DEFAULT_UPDATE_COMMAND: &str = "Fixed in build: ${YOUTRACK_BUILD_NAME}";

/// Variable holding the build name while the update command is expanded.
pub const BUILD_NAME_VARIABLE: &str = "YOUTRACK_BUILD_NAME";

/// A project field whose build bundle the build is added to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleField {
    pub project: String,
    pub field: String,
}

impl BundleField {
    /// Parses `PROJ:Field name`.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.split_once(':') {
            Some((project, field)) if !project.trim().is_empty() && !field.trim().is_empty() => {
                Ok(Self {
                    project: project.trim().to_string(),
                    field: field.trim().to_string(),
                })
            }
            _ => Err(format!("invalid bundle field '{s}': expected PROJECT:Field")),
        }
    }
}

/// What to do once a build has been dispatched.
#[derive(Debug, Clone, Default)]
pub struct BuildUpdate {
    /// Build bundles the build name is added to. Variables are expanded;
    /// blank names are skipped.
    pub bundles: Vec<String>,

    /// Fields whose build bundles the build name is added to, resolved
    /// through the tracker before the named bundles.
    pub bundle_fields: Vec<BundleField>,

    /// Name of the build in the tracker. Defaults to the build number.
    pub build_name: Option<String>,

    /// Command applied to each fixed issue. Defaults to [`DEFAULT_UPDATE_COMMAND`].
    pub command: Option<String>,

    /// Do nothing unless the build fixed at least one issue.
    pub only_if_fixed: bool,

    /// Also update fixed issues when the build is unstable.
    pub mark_fixed_if_unstable: bool,

    /// Don't notify watchers of the updated issues.
    pub silent: bool,
}

/// Runs [`BuildUpdate`]s against the tracker.
pub struct BuildUpdater<'a> {
    site: &'a SiteConfig,
    tracker: &'a dyn Tracker,
    env: &'a Environment,
}

impl<'a> BuildUpdater<'a> {
    pub fn new(site: &'a SiteConfig, tracker: &'a dyn Tracker, env: &'a Environment) -> Self {
        Self { site, tracker, env }
    }

    /// Adds the build to its bundles and marks the fixed issues as fixed in it.
    ///
    /// Failures degrade `build` per the site's failure mode. Returns every
    /// attempted action.
    pub fn update(
        &self,
        build: &mut Build,
        fixed_issues: &[IssueRef],
        update: &BuildUpdate,
    ) -> Vec<CommandResult> {
        let mut results = Vec::new();

        if update.only_if_fixed && fixed_issues.is_empty() {
            info!(build = build.number, "no fixed issues, nothing to update");
            return results;
        }

        let Some(user) = self.tracker.login() else {
            warn!(site = %self.site.name, "could not log in to tracker, skipping build update");
            build.degrade(self.site.failure_mode);
            return results;
        };

        let build_name = self.build_name(build, update);

        for bundle in self.bundles(&user, update) {
            let result = self.tracker.add_build_to_bundle(
                &user,
                &AddBuild {
                    site_name: &self.site.name,
                    bundle: &bundle,
                    build_name: &build_name,
                },
            );
            if result.is_ok() {
                info!(bundle = %bundle, build_name = %build_name, "added build to bundle");
            } else {
                warn!(bundle = %bundle, build_name = %build_name, "could not add build to bundle");
                build.degrade(self.site.failure_mode);
            }
            results.push(result);
        }

        let mark_fixed = match build.result {
            BuildResult::Success => true,
            BuildResult::Unstable => update.mark_fixed_if_unstable,
            BuildResult::Failure => false,
        };
        if !mark_fixed {
            info!(result = ?build.result, "build not stable, fixed issues left as they are");
            return results;
        }

        let env = self.env.with(BUILD_NAME_VARIABLE, &build_name);
        let command = env.expand(
            update
                .command
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(DEFAULT_UPDATE_COMMAND),
        );
        for issue in fixed_issues {
            let result = self.tracker.apply_command(
                &user,
                &ApplyCommand {
                    site_name: &self.site.name,
                    issue_id: issue.as_str(),
                    command: &command,
                    comment: None,
                    run_as: None,
                    notify: !update.silent,
                },
            );
            if result.is_ok() {
                info!(issue = %issue, command = %command, "updated fixed issue");
            } else {
                warn!(issue = %issue, command = %command, "could not update fixed issue");
                build.degrade(self.site.failure_mode);
            }
            results.push(result);
        }

        results
    }

    fn build_name(&self, build: &Build, update: &BuildUpdate) -> String {
        match update.build_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => self.env.expand(name),
            _ => build.number.to_string(),
        }
    }

    /// Bundles of the fields first, then the expanded named ones. Blank
    /// names and repeats are dropped.
    fn bundles(&self, user: &User, update: &BuildUpdate) -> Vec<String> {
        let from_fields = update.bundle_fields.iter().filter_map(|bf| {
            let bundle = self.tracker.bundle_for_field(user, &bf.project, &bf.field);
            if bundle.is_none() {
                warn!(project = %bf.project, field = %bf.field, "no build bundle for field");
            }
            bundle
        });
        let named = update
            .bundles
            .iter()
            .map(|bundle| self.env.expand(bundle.trim()));

        let mut bundles: Vec<String> = Vec::new();
        for bundle in from_fields.chain(named) {
            if !bundle.trim().is_empty() && !bundles.contains(&bundle) {
                bundles.push(bundle);
            }
        }
        bundles
    }
}
