//! Core data model for ytlink.
//!
//! Value records that flow between the scanner, the dispatcher and the
//! tracker: changes, projects, issue references, command results and builds.
//! Everything here is constructed once and never mutated in place, except a
//! build's result, which can only get worse.

mod annotation;
mod build;
mod change;
mod command;
mod issue;
mod project;
mod report;

pub use annotation::{IssueRef, ParsedAnnotation};
pub use build::{Build, BuildResult, FailureMode};
pub use change::{Author, ChangeEntry};
pub use command::{CommandResult, CommandStatus};
pub use issue::{Issue, User};
pub use project::{Project, ProjectRegistry};
pub use report::BuildReport;
