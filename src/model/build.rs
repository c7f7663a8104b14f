//! Builds and how tracker failures degrade them.

use serde::{Deserialize, Serialize};

/// The build a dispatch runs for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    /// Pipeline job name. Caches and reports are kept per job.
    pub job: String,

    pub number: u64,

    /// Absolute URL of the build, linked from tracker comments.
    pub url: String,

    pub result: BuildResult,
}

impl Build {
    /// Applies the site's failure mode after a tracker failure.
    ///
    /// A result never improves: an already failed build stays failed.
    pub fn degrade(&mut self, mode: FailureMode) {
        let degraded = match mode {
            FailureMode::None => return,
            FailureMode::Unstable => BuildResult::Unstable,
            FailureMode::Failure => BuildResult::Failure,
        };
        self.result = self.result.max(degraded);
    }
}

/// Build result, ordered from best to worst.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum BuildResult {
    #[default]
    Success,
    Unstable,
    Failure,
}

/// How a tracker failure affects the build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureMode {
    #[default]
    None,
    Unstable,
    Failure,
}
