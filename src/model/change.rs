//! Change entries: one unit of source-control change in a build.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single change that went into a build.
///
/// Read from the change file the pipeline hands to `ytlink dispatch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    /// Revision identifier (commit SHA, changelist number, ...).
    pub revision: String,

    /// Who made the change.
    pub author: Author,

    /// The change message as the SCM reported it.
    /// May be only the summary line; see `MessageSource`.
    #[serde(default)]
    pub message: String,

    /// Paths touched by the change.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

/// Author of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,

    /// Used to resolve the tracker user for run-as.
    #[serde(default)]
    pub email: Option<String>,
}
