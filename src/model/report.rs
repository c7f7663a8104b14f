//! Build reports: everything ytlink did for one build.

use serde::{Deserialize, Serialize};

use super::{BuildResult, CommandResult, IssueRef};

/// The audit trail of one build.
///
/// Written by `dispatch`; `update-build` and `report-failure` append their
/// own results to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    /// Every tracker action attempted, in order, whatever its status.
    pub commands: Vec<CommandResult>,

    /// Issues that moved into a fixed state because of this build's commands.
    pub fixed_issues: Vec<IssueRef>,

    /// The build result after tracker failures were applied.
    pub result: BuildResult,
}

impl BuildReport {
    pub fn failed_commands(&self) -> usize {
        self.commands.iter().filter(|c| !c.is_ok()).count()
    }
}
