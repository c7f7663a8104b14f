//! Tracker-side snapshots: issues and users.

use serde::{Deserialize, Serialize};

/// Snapshot of a tracker issue, fetched for fixed-state classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,

    /// Value of the configured state field.
    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// A tracker user: the session user, or a run-as target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub logged_in: bool,
}

impl User {
    /// Stand-in session after a failed login.
    pub fn anonymous() -> Self {
        Self {
            username: String::new(),
            email: None,
            logged_in: false,
        }
    }
}
