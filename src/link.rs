//! Comment linking: bare issue mentions and the "related build" comment.
//!
//! Independent of annotation scanning. Any `SHORT-123` token at the start of
//! a message or after an ASCII non-word character counts as a mention, so
//! `MYPROJ-1` never matches project `PROJ`. Each mentioned issue gets one
//! comment per build, however many changes mention it.

use std::collections::HashMap;

use regex::Regex;

use crate::model::{ChangeEntry, IssueRef, ProjectRegistry};

/// Issues mentioned in a message, in project order then position, without
/// repeats.
pub fn find_mentions(message: &str, projects: &ProjectRegistry) -> Vec<IssueRef> {
    let mut mentions: Vec<IssueRef> = Vec::new();
    for project in projects.iter() {
        let short = regex::escape(&project.short_name);
        let pattern = format!(r"^{short}-([0-9]+)|[^0-9A-Za-z_]{short}-([0-9]+)");
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        for caps in re.captures_iter(message) {
            let Some(number) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            let issue = IssueRef::new(&project.short_name, number.as_str());
            if !mentions.contains(&issue) {
                mentions.push(issue);
            }
        }
    }
    mentions
}

/// Changes of one build grouped by the issues they mention.
#[derive(Debug, Default)]
pub struct RelatedChanges<'a> {
    /// Issues in first-encounter order.
    issues: Vec<IssueRef>,
    changes: HashMap<IssueRef, Vec<&'a ChangeEntry>>,
}

impl<'a> RelatedChanges<'a> {
    /// Records that `entry` mentions `issue`.
    pub fn add(&mut self, issue: IssueRef, entry: &'a ChangeEntry) {
        let changes = self.changes.entry(issue.clone()).or_default();
        if changes.is_empty() {
            self.issues.push(issue);
        }
        changes.push(entry);
    }

    /// Each mentioned issue once, with every change that mentions it.
    pub fn iter(&self) -> impl Iterator<Item = (&IssueRef, &[&'a ChangeEntry])> {
        self.issues.iter().map(|issue| {
            let changes = self.changes.get(issue).map_or(&[][..], Vec::as_slice);
            (issue, changes)
        })
    }
}

/// Text of the "related build" comment.
pub fn related_build_comment(build_url: &str, changes: &[&ChangeEntry]) -> String {
    let mut text = format!("Related build: {build_url}");
    for change in changes {
        text.push_str("\nSHA: ");
        text.push_str(&change.revision);
    }
    text
}
