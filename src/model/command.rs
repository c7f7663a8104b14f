//! Command results: the audit record of every tracker action.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Outcome of one tracker action: a comment, a command, a bundle update
/// or an issue creation.
///
/// Produced by the tracker and appended to the build's audit list as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub site_name: String,

    /// `None` for actions that don't target an issue (bundle updates).
    pub issue_id: Option<String>,

    /// The tracker user the action ran as, when logged in.
    pub username: Option<String>,

    pub comment: Option<String>,

    /// The command text, or a bracketed description for non-command actions
    /// (e.g. `[Create issue]`).
    pub command: String,

    /// Tracker-provided error text.
    pub response: Option<String>,

    pub status: CommandStatus,

    /// Visibility group of a posted comment.
    pub group: Option<String>,

    pub date: Timestamp,

    pub silent: bool,
}

impl CommandResult {
    pub fn is_ok(&self) -> bool {
        self.status == CommandStatus::Ok
    }
}

/// Whether a tracker action went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Ok,

    /// Executed but rejected, or the transport failed.
    Failed,

    /// No authenticated tracker session.
    NotLoggedIn,
}
