//! The issue tracker, as seen by the dispatcher.
//!
//! Tracker outcomes are data, not errors: every action returns a
//! [`CommandResult`] whose status says whether it went through. Lookups
//! return `None` when the tracker can't answer.

mod bridge;

use std::path::Path;

use jiff::Timestamp;

pub use bridge::BridgeTracker;

use crate::model::{CommandResult, CommandStatus, Issue, Project, User};

/// Operations ytlink needs from an issue tracker.
pub trait Tracker {
    /// Open a session. `None` when authentication fails.
    fn login(&self) -> Option<User>;

    /// All projects visible to the user. `None` when unavailable.
    fn projects(&self, user: &User) -> Option<Vec<Project>>;

    /// Current snapshot of an issue, reading state from `state_field`.
    fn issue(&self, user: &User, issue_id: &str, state_field: &str) -> Option<Issue>;

    /// The tracker user with the given e-mail address.
    fn user_by_email(&self, user: &User, email: &str) -> Option<User>;

    /// The build bundle backing `field` in `project`.
    fn bundle_for_field(&self, user: &User, project: &str, field: &str) -> Option<String>;

    fn apply_command(&self, user: &User, request: &ApplyCommand<'_>) -> CommandResult;

    fn comment(&self, user: &User, request: &PostComment<'_>) -> CommandResult;

    fn add_build_to_bundle(&self, user: &User, request: &AddBuild<'_>) -> CommandResult;

    fn create_issue(&self, user: &User, request: &NewIssue<'_>) -> CommandResult;
}

/// Apply a command to an issue.
#[derive(Debug, Clone, Copy)]
pub struct ApplyCommand<'a> {
    pub site_name: &'a str,
    pub issue_id: &'a str,
    pub command: &'a str,
    pub comment: Option<&'a str>,
    pub run_as: Option<&'a User>,
    /// Notify watchers.
    pub notify: bool,
}

impl ApplyCommand<'_> {
    /// The audit record for this request with the given outcome.
    pub fn result(
        &self,
        user: &User,
        status: CommandStatus,
        response: Option<String>,
    ) -> CommandResult {
        CommandResult {
            site_name: self.site_name.to_string(),
            issue_id: Some(self.issue_id.to_string()),
            username: session_name(user),
            comment: self.comment.map(str::to_string),
            command: self.command.to_string(),
            response,
            status,
            group: None,
            date: Timestamp::now(),
            silent: !self.notify,
        }
    }
}

/// Post a comment on an issue.
#[derive(Debug, Clone, Copy)]
pub struct PostComment<'a> {
    pub site_name: &'a str,
    pub issue_id: &'a str,
    pub text: &'a str,
    /// Visibility group; `None` means visible to everyone who can see the issue.
    pub group: Option<&'a str>,
    pub silent: bool,
}

impl PostComment<'_> {
    pub fn result(
        &self,
        user: &User,
        status: CommandStatus,
        response: Option<String>,
    ) -> CommandResult {
        CommandResult {
            site_name: self.site_name.to_string(),
            issue_id: Some(self.issue_id.to_string()),
            username: session_name(user),
            comment: Some(self.text.to_string()),
            command: "[Comment]".to_string(),
            response,
            status,
            group: self.group.map(str::to_string),
            date: Timestamp::now(),
            silent: self.silent,
        }
    }
}

/// Add a build name to a build bundle.
#[derive(Debug, Clone, Copy)]
pub struct AddBuild<'a> {
    pub site_name: &'a str,
    pub bundle: &'a str,
    pub build_name: &'a str,
}

impl AddBuild<'_> {
    pub fn result(
        &self,
        user: &User,
        status: CommandStatus,
        response: Option<String>,
    ) -> CommandResult {
        CommandResult {
            site_name: self.site_name.to_string(),
            issue_id: None,
            username: session_name(user),
            comment: None,
            command: format!("[Add '{}' to '{}']", self.build_name, self.bundle),
            response,
            status,
            group: None,
            date: Timestamp::now(),
            silent: false,
        }
    }
}

/// Create a new issue.
#[derive(Debug, Clone, Copy)]
pub struct NewIssue<'a> {
    pub site_name: &'a str,
    pub project: &'a str,
    pub summary: &'a str,
    pub description: &'a str,
    /// Applied to the new issue once created.
    pub command: Option<&'a str>,
    pub attachment: Option<&'a Path>,
}

impl NewIssue<'_> {
    /// `issue_id` is the id of the created issue, when creation succeeded.
    pub fn result(
        &self,
        user: &User,
        issue_id: Option<String>,
        status: CommandStatus,
        response: Option<String>,
    ) -> CommandResult {
        CommandResult {
            site_name: self.site_name.to_string(),
            issue_id,
            username: session_name(user),
            comment: None,
            command: match self.command {
                Some(command) if !command.is_empty() => command.to_string(),
                _ => "[Create issue]".to_string(),
            },
            response,
            status,
            group: None,
            date: Timestamp::now(),
            silent: false,
        }
    }
}

fn session_name(user: &User) -> Option<String> {
    if user.logged_in {
        Some(user.username.clone())
    } else {
        None
    }
}
