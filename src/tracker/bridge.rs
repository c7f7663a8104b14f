//! Tracker bridge: drive the tracker through an external program.
//!
//! The bridge program owns the wire protocol and authentication. ytlink runs
//! it once per operation and reads JSON from stdout:
//!
//! ```text
//! <program> [args] whoami                                  -> {"username": ...}
//! <program> [args] projects                                -> [{"shortName": ...}]
//! <program> [args] issue <id> --state-field <f>            -> {"id", "state", ...}
//! <program> [args] user-by-email <email>                   -> {"username": ...} | null
//! <program> [args] bundle-for-field <project> <field>      -> {"name": ...} | null
//! <program> [args] apply <id> --command <c> [--comment <t>] [--run-as <u>] [--silent]
//! <program> [args] comment <id> --body <t> [--group <g>] [--silent]
//! <program> [args] add-build <bundle> <build>
//! <program> [args] create-issue --project <p> --summary <s> --description <d>
//!                               [--command <c>] [--attach <path>]  -> {"id": ...}
//! ```
//!
//! A non-zero exit is a failed action; stderr becomes the recorded response.

use std::io;
use std::process::Command;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::model::{CommandStatus, CommandResult, Issue, Project, User};

use super::{AddBuild, ApplyCommand, NewIssue, PostComment, Tracker};

/// Errors from running the bridge program.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} {subcommand} failed: {stderr}")]
    Exit {
        program: String,
        subcommand: String,
        stderr: String,
    },

    #[error("unexpected output from {program}: {source}")]
    Json {
        program: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A [`Tracker`] backed by an external bridge program.
#[derive(Debug, Clone)]
pub struct BridgeTracker {
    program: String,
    args: Vec<String>,
}

impl BridgeTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    /// Run the bridge with a subcommand and return stdout on success.
    fn run(&self, args: &[&str]) -> Result<String, BridgeError> {
        debug!(program = %self.program, ?args, "running tracker bridge");

        let output = Command::new(&self.program)
            .args(&self.args)
            .args(args)
            .output()
            .map_err(|source| BridgeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(BridgeError::Exit {
                program: self.program.clone(),
                subcommand: args.first().copied().unwrap_or_default().to_string(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run the bridge and parse its stdout as JSON.
    fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, BridgeError> {
        let stdout = self.run(args)?;
        serde_json::from_str(&stdout).map_err(|source| BridgeError::Json {
            program: self.program.clone(),
            source,
        })
    }

    /// Run an action and turn the outcome into a status and response.
    fn act(&self, args: &[&str]) -> (CommandStatus, Option<String>) {
        match self.run(args) {
            Ok(_) => (CommandStatus::Ok, None),
            Err(e) => {
                warn!("tracker action failed: {e}");
                (CommandStatus::Failed, Some(failure_response(e)))
            }
        }
    }
}

/// JSON shape returned by `whoami` and `user-by-email`.
#[derive(Deserialize)]
struct BridgeUser {
    username: String,
    #[serde(default)]
    email: Option<String>,
}

impl BridgeUser {
    fn into_user(self) -> User {
        User {
            username: self.username,
            email: self.email,
            logged_in: true,
        }
    }
}

/// JSON shape returned by `bundle-for-field`.
#[derive(Deserialize)]
struct BundleName {
    name: String,
}

/// JSON shape returned by `create-issue`.
#[derive(Deserialize)]
struct CreatedIssue {
    id: String,
}

impl Tracker for BridgeTracker {
    fn login(&self) -> Option<User> {
        match self.run_json::<BridgeUser>(&["whoami"]) {
            Ok(user) => Some(user.into_user()),
            Err(e) => {
                warn!("tracker login failed: {e}");
                None
            }
        }
    }

    fn projects(&self, user: &User) -> Option<Vec<Project>> {
        if !user.logged_in {
            return None;
        }
        self.run_json(&["projects"])
            .inspect_err(|e| warn!("could not list tracker projects: {e}"))
            .ok()
    }

    fn issue(&self, user: &User, issue_id: &str, state_field: &str) -> Option<Issue> {
        if !user.logged_in {
            return None;
        }
        self.run_json(&["issue", issue_id, "--state-field", state_field])
            .inspect_err(|e| warn!("could not get issue {issue_id}: {e}"))
            .ok()
    }

    fn user_by_email(&self, user: &User, email: &str) -> Option<User> {
        if !user.logged_in {
            return None;
        }
        self.run_json::<Option<BridgeUser>>(&["user-by-email", email])
            .inspect_err(|e| warn!("could not look up user {email}: {e}"))
            .ok()
            .flatten()
            .map(BridgeUser::into_user)
    }

    fn bundle_for_field(&self, user: &User, project: &str, field: &str) -> Option<String> {
        if !user.logged_in {
            return None;
        }
        self.run_json::<Option<BundleName>>(&["bundle-for-field", project, field])
            .inspect_err(|e| warn!("could not resolve bundle of {project} {field}: {e}"))
            .ok()
            .flatten()
            .map(|bundle| bundle.name)
    }

    fn apply_command(&self, user: &User, request: &ApplyCommand<'_>) -> CommandResult {
        if !user.logged_in {
            return request.result(user, CommandStatus::NotLoggedIn, None);
        }
        let mut args = vec!["apply", request.issue_id, "--command", request.command];
        if let Some(comment) = request.comment {
            args.extend(["--comment", comment]);
        }
        if let Some(run_as) = request.run_as {
            args.extend(["--run-as", run_as.username.as_str()]);
        }
        if !request.notify {
            args.push("--silent");
        }
        let (status, response) = self.act(&args);
        request.result(user, status, response)
    }

    fn comment(&self, user: &User, request: &PostComment<'_>) -> CommandResult {
        if !user.logged_in {
            return request.result(user, CommandStatus::NotLoggedIn, None);
        }
        let mut args = vec!["comment", request.issue_id, "--body", request.text];
        if let Some(group) = request.group {
            args.extend(["--group", group]);
        }
        if request.silent {
            args.push("--silent");
        }
        let (status, response) = self.act(&args);
        request.result(user, status, response)
    }

    fn add_build_to_bundle(&self, user: &User, request: &AddBuild<'_>) -> CommandResult {
        if !user.logged_in {
            return request.result(user, CommandStatus::NotLoggedIn, None);
        }
        let (status, response) = self.act(&["add-build", request.bundle, request.build_name]);
        request.result(user, status, response)
    }

    fn create_issue(&self, user: &User, request: &NewIssue<'_>) -> CommandResult {
        if !user.logged_in {
            return request.result(user, None, CommandStatus::NotLoggedIn, None);
        }
        let attachment = request.attachment.map(|p| p.to_string_lossy().into_owned());
        let mut args = vec![
            "create-issue",
            "--project",
            request.project,
            "--summary",
            request.summary,
            "--description",
            request.description,
        ];
        if let Some(command) = request.command.filter(|c| !c.is_empty()) {
            args.extend(["--command", command]);
        }
        if let Some(path) = attachment.as_deref() {
            args.extend(["--attach", path]);
        }
        match self.run_json::<CreatedIssue>(&args) {
            Ok(created) => request.result(user, Some(created.id), CommandStatus::Ok, None),
            Err(e) => {
                warn!("could not create issue in {}: {e}", request.project);
                request.result(user, None, CommandStatus::Failed, Some(failure_response(e)))
            }
        }
    }
}

/// The text recorded as a failed action's response.
fn failure_response(error: BridgeError) -> String {
    match error {
        BridgeError::Exit { stderr, .. } if !stderr.is_empty() => stderr,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge(program: &str, args: &[&str]) -> BridgeTracker {
        BridgeTracker::new(&TrackerConfig {
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        })
    }

    fn session() -> User {
        User {
            username: "tester".into(),
            email: None,
            logged_in: true,
        }
    }

    fn apply<'a>(command: &'a str) -> ApplyCommand<'a> {
        ApplyCommand {
            site_name: "testsite",
            issue_id: "TP1-1",
            command,
            comment: None,
            run_as: None,
            notify: true,
        }
    }

    #[test]
    fn not_logged_in_skips_the_program() {
        let tracker = bridge("ytlink-bridge-that-does-not-exist", &[]);
        let result = tracker.apply_command(&User::anonymous(), &apply("Fixed"));
        assert_eq!(result.status, CommandStatus::NotLoggedIn);
        assert_eq!(result.username, None);
    }

    #[test]
    fn missing_program_is_a_failed_action() {
        let tracker = bridge("ytlink-bridge-that-does-not-exist", &[]);
        let result = tracker.apply_command(&session(), &apply("Fixed"));
        assert_eq!(result.status, CommandStatus::Failed);
        assert!(result.response.unwrap().contains("failed to run"));
        assert!(tracker.login().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn successful_exit_is_ok() {
        let tracker = bridge("true", &[]);
        let result = tracker.apply_command(&session(), &apply("Fixed"));
        assert_eq!(result.status, CommandStatus::Ok);
        assert_eq!(result.username.as_deref(), Some("tester"));
        assert_eq!(result.command, "Fixed");
    }

    #[cfg(unix)]
    #[test]
    fn failing_exit_records_stderr() {
        let tracker = bridge("sh", &["-c", "echo 'no such command' >&2; exit 1", "bridge"]);
        let result = tracker.apply_command(&session(), &apply("Frobnicate"));
        assert_eq!(result.status, CommandStatus::Failed);
        assert_eq!(result.response.as_deref(), Some("no such command"));
    }

    #[cfg(unix)]
    #[test]
    fn login_reads_user_json() {
        let tracker = bridge("sh", &["-c", r#"echo '{"username": "ci-bot"}'"#, "bridge"]);
        let user = tracker.login().unwrap();
        assert_eq!(user.username, "ci-bot");
        assert!(user.logged_in);
    }

    #[cfg(unix)]
    #[test]
    fn projects_read_short_names() {
        let tracker = bridge(
            "sh",
            &["-c", r#"echo '[{"shortName": "TP1"}, {"shortName": "TP2"}]'"#, "bridge"],
        );
        let projects = tracker.projects(&session()).unwrap();
        assert_eq!(projects, vec![Project::new("TP1"), Project::new("TP2")]);
    }

    #[cfg(unix)]
    #[test]
    fn bundle_for_field_reads_name() {
        let tracker = bridge(
            "sh",
            &[
                "-c",
                r#"[ "$3" = "Fixed in build" ] && echo '{"name": "TP1 builds"}' || echo null"#,
                "bridge",
            ],
        );
        assert_eq!(
            tracker.bundle_for_field(&session(), "TP1", "Fixed in build"),
            Some("TP1 builds".to_string())
        );
        assert_eq!(tracker.bundle_for_field(&session(), "TP1", "Other"), None);
        assert_eq!(tracker.bundle_for_field(&User::anonymous(), "TP1", "Fixed in build"), None);
    }

    #[cfg(unix)]
    #[test]
    fn unparseable_issue_is_none() {
        let tracker = bridge("sh", &["-c", "echo not-json", "bridge"]);
        assert!(tracker.issue(&session(), "TP1-1", "State").is_none());
    }
}
