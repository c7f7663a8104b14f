//! The command dispatcher: run a build's changes against the tracker.
//!
//! One dispatch logs in, resolves the project registry, posts "related build"
//! comments, then scans every unprocessed change for annotations and applies
//! their commands. Tracker failures never stop a dispatch; they degrade the
//! build according to the site's failure mode and end up in the report.

use tracing::{debug, error, info, warn};

use crate::classify::FixedValues;
use crate::config::SiteConfig;
use crate::expand::Environment;
use crate::link::{RelatedChanges, find_mentions, related_build_comment};
use crate::model::{
    Build, BuildReport, ChangeEntry, CommandResult, IssueRef, ParsedAnnotation, ProjectRegistry,
    User,
};
use crate::scan::{PrefixAliases, scan};
use crate::source::MessageSource;
use crate::storage::{ProcessedRevisions, Storage};
use crate::tracker::{ApplyCommand, PostComment, Tracker};

/// Applies the annotations of a build's changes to the tracker.
pub struct Dispatcher<'a> {
    site: &'a SiteConfig,
    tracker: &'a dyn Tracker,
    storage: &'a Storage,
    revisions: &'a ProcessedRevisions,
    source: &'a dyn MessageSource,
    env: &'a Environment,
}

/// Per-dispatch state shared by every command.
struct Session<'s> {
    user: User,
    aliases: PrefixAliases,
    fixed_values: FixedValues,
    report: &'s mut BuildReport,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        site: &'a SiteConfig,
        tracker: &'a dyn Tracker,
        storage: &'a Storage,
        revisions: &'a ProcessedRevisions,
        source: &'a dyn MessageSource,
        env: &'a Environment,
    ) -> Self {
        Self {
            site,
            tracker,
            storage,
            revisions,
            source,
            env,
        }
    }

    /// Dispatches every change of a build.
    ///
    /// `build.result` is degraded in place; the returned report carries the
    /// final result along with every attempted action and the issues that
    /// became fixed.
    pub fn dispatch(&self, build: &mut Build, entries: &[ChangeEntry]) -> BuildReport {
        let mut report = BuildReport::default();

        let user = match self.tracker.login() {
            Some(user) => {
                debug!(username = %user.username, "logged in to tracker");
                user
            }
            None => {
                warn!(site = %self.site.name, "could not log in to tracker");
                build.degrade(self.site.failure_mode);
                User::anonymous()
            }
        };

        let registry = self.registry(&build.job, &user);
        if registry.is_empty() {
            warn!(job = %build.job, "no tracker projects known, nothing to link");
        }

        let messages: Vec<String> = entries.iter().map(|e| self.source.message(e)).collect();

        if self.site.comments_enabled {
            self.link_changes(build, &user, &registry, entries, &messages, &mut report);
        }

        let included = registry.restricted_to(&self.site.execute_project_limits);
        let mut session = Session {
            user,
            aliases: self.site.prefix_aliases(),
            fixed_values: self.site.fixed_values(),
            report: &mut report,
        };

        for (entry, message) in entries.iter().zip(&messages) {
            let claim = if self.site.track_commits {
                let Some(claim) = self.revisions.claim(&entry.revision) else {
                    debug!(revision = %entry.revision, "already processed, skipping");
                    continue;
                };
                Some(claim)
            } else {
                None
            };
            let attempted = self.execute_commands(build, &mut session, &included, entry, message);
            if attempted > 0
                && let Some(claim) = claim
            {
                claim.record();
            }
        }

        report.result = build.result;
        info!(
            job = %build.job,
            build = build.number,
            commands = report.commands.len(),
            failed = report.failed_commands(),
            fixed = report.fixed_issues.len(),
            result = ?report.result,
            "dispatch finished"
        );
        report
    }

    /// The projects known for this run: the tracker's, else the job's cache.
    fn registry(&self, job: &str, user: &User) -> ProjectRegistry {
        if let Some(projects) = self.tracker.projects(user) {
            let registry = ProjectRegistry::new(projects);
            if let Err(e) = self.storage.save_project_names(job, &registry) {
                error!(job, "could not cache project names: {e}");
            }
            return registry;
        }
        match self.storage.load_project_names(job) {
            Ok(registry) => {
                info!(job, projects = registry.len(), "using cached project names");
                registry
            }
            Err(e) => {
                error!(job, "could not load cached project names: {e}");
                ProjectRegistry::default()
            }
        }
    }

    /// Posts one "related build" comment per mentioned issue.
    fn link_changes(
        &self,
        build: &mut Build,
        user: &User,
        registry: &ProjectRegistry,
        entries: &[ChangeEntry],
        messages: &[String],
        report: &mut BuildReport,
    ) {
        let mut related = RelatedChanges::default();
        for (entry, message) in entries.iter().zip(messages) {
            for issue in find_mentions(message, registry) {
                related.add(issue, entry);
            }
        }

        for (issue, changes) in related.iter() {
            let text = related_build_comment(&build.url, changes);
            let result = self.tracker.comment(
                user,
                &PostComment {
                    site_name: &self.site.name,
                    issue_id: issue.as_str(),
                    text: &text,
                    group: self.site.link_group(),
                    silent: self.site.silent_links,
                },
            );
            if result.is_ok() {
                info!(issue = %issue, "commented with related build");
            } else {
                warn!(issue = %issue, status = ?result.status, "could not comment on issue");
                build.degrade(self.site.failure_mode);
            }
            report.commands.push(result);
        }
    }

    /// Applies the annotations of one change. Returns how many commands were attempted.
    fn execute_commands(
        &self,
        build: &mut Build,
        session: &mut Session<'_>,
        projects: &ProjectRegistry,
        entry: &ChangeEntry,
        message: &str,
    ) -> usize {
        if !self.site.commands_enabled || projects.is_empty() {
            return 0;
        }

        let mut attempted = 0;
        for annotation in scan(projects, &session.aliases, message) {
            if !annotation.has_commands() {
                debug!(issue = %annotation.issue, "annotation without a command");
                continue;
            }
            attempted += self.apply_annotation(build, session, entry, &annotation);
        }
        attempted
    }

    /// The alias command first, then the written one. A failure of the first
    /// doesn't prevent the second.
    fn apply_annotation(
        &self,
        build: &mut Build,
        session: &mut Session<'_>,
        entry: &ChangeEntry,
        annotation: &ParsedAnnotation,
    ) -> usize {
        let mut attempted = 0;
        if let Some(extra) = &annotation.extra_command {
            let command = self.env.expand(extra);
            self.apply(build, session, entry, annotation, &command, None);
            attempted += 1;
        }
        if !annotation.command.is_empty() {
            let comment = annotation.comment.as_deref();
            self.apply(build, session, entry, annotation, &annotation.command, comment);
            attempted += 1;
        }
        attempted
    }

    /// Applies one command, recording whether it moved the issue into a fixed state.
    fn apply(
        &self,
        build: &mut Build,
        session: &mut Session<'_>,
        entry: &ChangeEntry,
        annotation: &ParsedAnnotation,
        command: &str,
        comment: Option<&str>,
    ) {
        let issue_id = annotation.issue.as_str();
        let run_as = if self.site.run_as_enabled {
            self.run_as(build, &session.user, entry)
        } else {
            None
        };

        let state_field = self.site.state_field();
        let before = self.tracker.issue(&session.user, issue_id, state_field);
        let silent = self.site.silent_commands || annotation.silent;
        let result = self.tracker.apply_command(
            &session.user,
            &ApplyCommand {
                site_name: &self.site.name,
                issue_id,
                command,
                comment,
                run_as: run_as.as_ref(),
                notify: !silent,
            },
        );
        self.record(build, session.report, result);
        let after = self.tracker.issue(&session.user, issue_id, state_field);

        if session
            .fixed_values
            .became_fixed(before.as_ref(), after.as_ref())
        {
            add_fixed(session.report, &annotation.issue);
        }
    }

    /// The tracker user matching the change author's e-mail.
    fn run_as(&self, build: &mut Build, user: &User, entry: &ChangeEntry) -> Option<User> {
        let found = entry
            .author
            .email
            .as_deref()
            .and_then(|email| self.tracker.user_by_email(user, email));
        if found.is_none() {
            warn!(
                author = %entry.author.name,
                email = entry.author.email.as_deref().unwrap_or(""),
                "no tracker user for author, applying as the session user"
            );
            build.degrade(self.site.failure_mode);
        }
        found
    }

    fn record(&self, build: &mut Build, report: &mut BuildReport, result: CommandResult) {
        let issue = result.issue_id.as_deref().unwrap_or("");
        if result.is_ok() {
            info!(issue, command = %result.command, "applied command");
        } else {
            warn!(
                issue,
                command = %result.command,
                status = ?result.status,
                response = result.response.as_deref().unwrap_or(""),
                "command failed"
            );
            build.degrade(self.site.failure_mode);
        }
        report.commands.push(result);
    }
}

fn add_fixed(report: &mut BuildReport, issue: &IssueRef) {
    if !report.fixed_issues.contains(issue) {
        info!(issue = %issue, project = issue.project(), "issue fixed by this build");
        report.fixed_issues.push(issue.clone());
    }
}
