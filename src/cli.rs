//! CLI interface for ytlink.
//!
//! Meant to be called from pipeline steps. Each subcommand is
//! non-interactive: arguments and files in, JSON on stdout, a short
//! human-readable summary on stderr.
//!
//! - `ytlink scan`: show what a message would do, without a tracker.
//! - `ytlink dispatch`: apply a build's changes to the tracker.
//! - `ytlink update-build`: add the build to bundles and mark fixed issues.
//! - `ytlink report-failure`: open an issue for a failed build.
//! - `ytlink revisions`: inspect the processed-revisions store.

mod build;
mod format;
mod revisions;
mod scan;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::build_update::BundleField;
use crate::config::Config;
use crate::failure_issue::Threshold;
use crate::model::BuildResult;
use crate::storage::Storage;

/// ytlink: link builds to the issue tracker.
#[derive(Debug, Parser)]
#[command(name = "ytlink", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r##"Workflow: one build
  1. ytlink dispatch --job app --number 12 --url "$BUILD_URL" --changes changes.json
     → applies "#PROJ-1 Fixed" annotations, comments on mentioned issues
  2. ytlink update-build --job app --number 12 --bundle "App builds"
     → adds build 12 to the bundle, marks fixed issues "Fixed in build: 12"
  3. ytlink report-failure --job app --number 12 --url "$BUILD_URL" --result failure --project PROJ

Try a message locally:
  ytlink scan --project PROJ --alias fixes=Fixed "Fixes #PROJ-1 Assignee me""##;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a message for annotations and print them as JSON.
    ///
    /// Pure: no tracker, no storage. Prefix aliases come from the config
    /// unless `--alias` is given. The message is read from stdin when omitted.
    Scan {
        /// Known project short name, in match order. Repeatable.
        #[arg(long = "project", required = true)]
        projects: Vec<String>,

        /// Prefix alias as `prefix=command`. Repeatable.
        #[arg(long = "alias")]
        aliases: Vec<String>,

        /// The message to scan.
        message: Option<String>,
    },

    /// Apply the annotations of a build's changes to the tracker.
    ///
    /// This run's results are merged into the build's stored report, which is
    /// then written to `--out` (if given) or stdout. A re-run keeps what
    /// earlier runs of the same build recorded.
    Dispatch {
        #[command(flatten)]
        build: BuildArgs,

        /// JSON file with the build's change entries.
        #[arg(long)]
        changes: PathBuf,

        /// Where full change messages come from.
        #[arg(long, value_enum, default_value_t = ScmArg::Entry)]
        scm: ScmArg,

        /// Repository to read messages from with `--scm git`.
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Write the report JSON to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Add the build to bundles and mark the issues it fixed.
    ///
    /// Reads the fixed issues from the build's report and appends the
    /// results to it.
    UpdateBuild {
        #[command(flatten)]
        build: BuildArgs,

        /// Build bundle to add the build to. Repeatable; variables are expanded.
        #[arg(long = "bundle")]
        bundles: Vec<String>,

        /// Project field as `PROJ:Field`; the build goes into its build bundle. Repeatable.
        #[arg(long = "bundle-field", value_parser = BundleField::parse)]
        bundle_fields: Vec<BundleField>,

        /// Build name in the tracker (default: the build number).
        #[arg(long)]
        build_name: Option<String>,

        /// Command applied to fixed issues.
        #[arg(long, default_value = crate::build_update::DEFAULT_UPDATE_COMMAND)]
        command: String,

        /// Skip everything when the build fixed no issues.
        #[arg(long)]
        only_if_fixed: bool,

        /// Mark issues fixed even when the build is unstable.
        #[arg(long)]
        mark_fixed_if_unstable: bool,

        /// Don't notify watchers of updated issues.
        #[arg(long)]
        silent: bool,
    },

    /// Open a tracker issue for a failed build.
    ReportFailure {
        #[command(flatten)]
        build: BuildArgs,

        /// Project to create the issue in.
        #[arg(long)]
        project: String,

        /// Issue summary (default: "Build failure in build <number>").
        #[arg(long)]
        summary: Option<String>,

        /// Issue description (default: the build URL).
        #[arg(long)]
        description: Option<String>,

        /// Command applied to the new issue.
        #[arg(long)]
        command: Option<String>,

        /// Which results warrant an issue.
        #[arg(long, value_enum, default_value_t = ThresholdArg::Failure)]
        threshold: ThresholdArg,

        /// Build log to attach.
        #[arg(long)]
        attach_log: Option<PathBuf>,
    },

    /// Inspect processed revisions.
    Revisions {
        #[command(subcommand)]
        command: RevisionsCommand,
    },
}

/// Identifies the build a command runs for.
#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Pipeline job name.
    #[arg(long)]
    job: String,

    /// Build number.
    #[arg(long)]
    number: u64,

    /// Absolute build URL.
    #[arg(long, default_value = "")]
    url: String,

    /// Result of the build so far.
    #[arg(long, value_enum, default_value_t = ResultArg::Success)]
    result: ResultArg,
}

#[derive(Debug, Subcommand)]
pub enum RevisionsCommand {
    /// Exit with an error unless the revision was processed.
    Check {
        revision: String,
    },

    /// List processed revisions.
    List,
}

/// CLI-facing build result, mapped to the domain `BuildResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResultArg {
    Success,
    Unstable,
    Failure,
}

impl ResultArg {
    fn to_domain(self) -> BuildResult {
        match self {
            Self::Success => BuildResult::Success,
            Self::Unstable => BuildResult::Unstable,
            Self::Failure => BuildResult::Failure,
        }
    }
}

/// Where full change messages come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScmArg {
    /// The message recorded in the change file.
    Entry,
    /// `git show` in `--repo`, falling back to the recorded message.
    Git,
}

/// CLI-facing failure threshold, mapped to the domain `Threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThresholdArg {
    /// Only failed builds.
    Failure,
    /// Failed and unstable builds.
    FailureOrUnstable,
}

impl ThresholdArg {
    fn to_domain(self) -> Threshold {
        match self {
            Self::Failure => Threshold::Failure,
            Self::FailureOrUnstable => Threshold::FailureOrUnstable,
        }
    }
}

/// Run a parsed command, returning an error message on failure.
///
/// The config is only loaded by commands that talk to the tracker, and by
/// `scan` when no `--alias` is given.
pub fn run(cli: Cli, storage: &Storage) -> Result<(), String> {
    let config = || Config::load(storage.root());

    match cli.command {
        Command::Scan {
            projects,
            aliases,
            message,
        } => {
            let aliases = if aliases.is_empty() {
                config()?.site.prefix_aliases()
            } else {
                scan::parse_aliases(&aliases)?
            };
            scan::cmd_scan(&projects, &aliases, message)
        }
        Command::Dispatch {
            build,
            changes,
            scm,
            repo,
            out,
        } => build::cmd_dispatch(&config()?, storage, &build, &changes, scm, &repo, out),
        Command::UpdateBuild {
            build,
            bundles,
            bundle_fields,
            build_name,
            command,
            only_if_fixed,
            mark_fixed_if_unstable,
            silent,
        } => {
            let update = crate::build_update::BuildUpdate {
                bundles,
                bundle_fields,
                build_name,
                command: Some(command),
                only_if_fixed,
                mark_fixed_if_unstable,
                silent,
            };
            build::cmd_update_build(&config()?, storage, &build, &update)
        }
        Command::ReportFailure {
            build,
            project,
            summary,
            description,
            command,
            threshold,
            attach_log,
        } => {
            let issue = crate::failure_issue::FailureIssue {
                project,
                summary,
                description,
                command,
                threshold: threshold.to_domain(),
                build_log: attach_log,
            };
            build::cmd_report_failure(&config()?, storage, &build, &issue)
        }
        Command::Revisions { command } => match command {
            RevisionsCommand::Check { revision } => revisions::cmd_check(storage, &revision),
            RevisionsCommand::List => revisions::cmd_list(storage),
        },
    }
}
