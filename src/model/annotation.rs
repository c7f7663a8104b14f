//! Scanner output: issue references and parsed annotations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A validated `<shortName>-<digits>` issue identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueRef(String);

impl IssueRef {
    /// Only the scanner and linker build these, from a registry project and a
    /// digit run they matched.
    pub(crate) fn new(short_name: &str, number: &str) -> Self {
        Self(format!("{short_name}-{number}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The project short name part of the id.
    pub fn project(&self) -> &str {
        self.0.rsplit_once('-').map_or(self.0.as_str(), |(p, _)| p)
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IssueRef> for String {
    fn from(issue: IssueRef) -> Self {
        issue.0
    }
}

/// One annotation found in a change message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAnnotation {
    pub issue: IssueRef,

    /// Literal text after the issue number. May be empty.
    pub command: String,

    /// Lines following the annotation line, up to the next `#` line.
    pub comment: Option<String>,

    /// `!#` was used: apply without notifying watchers.
    pub silent: bool,

    /// Command implied by a prefix alias, applied before `command`.
    pub extra_command: Option<String>,
}

impl ParsedAnnotation {
    /// Whether dispatching this annotation would send anything.
    pub fn has_commands(&self) -> bool {
        self.extra_command.is_some() || !self.command.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_part_of_issue_id() {
        assert_eq!(IssueRef::new("PYAT", "12").project(), "PYAT");
        assert_eq!(IssueRef::new("MY-PROJ", "3").project(), "MY-PROJ");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&IssueRef::new("TP1", "1")).unwrap();
        assert_eq!(json, "\"TP1-1\"");
    }
}
