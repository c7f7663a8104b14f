//! Fixed-state classification: did applying a command fix the issue?
//!
//! Commands are opaque, so instead of interpreting them the issue state is
//! fetched before and after the command is applied. An issue counts as fixed
//! by the build when it moved from a non-fixed state into a fixed one.
//!
//! Someone else changing the issue between the two fetches can make this
//! attribute a fix to the build that it didn't make. That is accepted.

use std::collections::BTreeSet;

use crate::model::Issue;

/// State values that count as resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedValues(BTreeSet<String>);

impl FixedValues {
    /// The value used when none are configured.
    pub const DEFAULT: &'static str = "Fixed";

    /// Builds the set from configured values, trimming and skipping blanks.
    /// Falls back to `Fixed` when nothing usable is configured.
    pub fn new<S: AsRef<str>>(values: &[S]) -> Self {
        let set: BTreeSet<String> = values
            .iter()
            .map(|v| v.as_ref().trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        if set.is_empty() {
            Self::default()
        } else {
            Self(set)
        }
    }

    pub fn contains(&self, state: &str) -> bool {
        self.0.contains(state)
    }

    /// Whether the change from `before` to `after` is a transition into a
    /// fixed state. A missing snapshot or a missing state never qualifies.
    pub fn became_fixed(&self, before: Option<&Issue>, after: Option<&Issue>) -> bool {
        let (Some(before), Some(after)) = (before, after) else {
            return false;
        };
        let was_fixed = before.state.as_deref().is_some_and(|s| self.contains(s));
        let is_fixed = after.state.as_deref().is_some_and(|s| self.contains(s));
        !was_fixed && is_fixed
    }
}

impl Default for FixedValues {
    fn default() -> Self {
        Self(BTreeSet::from([Self::DEFAULT.to_string()]))
    }
}
