//! Annotation scanning: find `#ISSUE-1 command` lines in change messages.
//!
//! A line containing `#` is an annotation line. The text after the first `#`
//! must start with a known project short name followed by `-` and digits; the
//! rest of the line is the command. Lines that follow, up to the next line
//! containing `#`, are the comment sent along with the command.
//!
//! ```text
//! Fixes !#TP1-1 Fixed        <- alias "fixes", silent, command "Fixed"
//! The widget no longer       <- comment
//! crashes on empty input.    <- comment
//! #TP1-2                     <- next annotation, empty command
//! ```
//!
//! Scanning is pure: no I/O, and the same inputs always give the same output.

use regex::Regex;

use crate::model::{IssueRef, ParsedAnnotation, Project, ProjectRegistry};

/// Marks an annotation line.
const MARKER: char = '#';

/// Placed directly before (`!#`) or after (`#!`) the marker to apply
/// without notifications.
const SILENT_MARKER: char = '!';

/// Prefix phrases that imply an extra command.
///
/// Keys are stored lowercase. Lookup is by suffix: with `fixes` → `Fixed`,
/// both `Fixes #TP1-1` and `This commit fixes #TP1-1` resolve to `Fixed`.
/// The first matching key in configuration order wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixAliases {
    pairs: Vec<(String, String)>,
}

impl PrefixAliases {
    /// Builds the alias table, skipping pairs with an empty prefix or command.
    pub fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut table: Vec<(String, String)> = Vec::new();
        for (prefix, command) in pairs {
            let prefix = prefix.trim().to_lowercase();
            if prefix.is_empty() || command.is_empty() {
                continue;
            }
            if table.iter().any(|(p, _)| *p == prefix) {
                continue;
            }
            table.push((prefix, command.to_string()));
        }
        Self { pairs: table }
    }

    /// Command for the text preceding an annotation marker, if any alias ends it.
    pub fn resolve(&self, window: &str) -> Option<&str> {
        let window = window.trim().to_lowercase();
        if window.is_empty() {
            return None;
        }
        self.pairs
            .iter()
            .find(|(prefix, _)| window.ends_with(prefix.as_str()))
            .map(|(_, command)| command.as_str())
    }
}

/// Scan a change message for annotations.
pub fn scan(
    projects: &ProjectRegistry,
    aliases: &PrefixAliases,
    message: &str,
) -> Vec<ParsedAnnotation> {
    let lines: Vec<&str> = message.lines().collect();
    let mut annotations = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        i += 1;

        let Some(hash_pos) = line.find(MARKER) else {
            continue;
        };

        let before = &line[..hash_pos];
        let after = &line[hash_pos + MARKER.len_utf8()..];
        let (window, silent_before) = match before.strip_suffix(SILENT_MARKER) {
            Some(window) => (window, true),
            None => (before, false),
        };
        let (tail, silent_after) = match after.strip_prefix(SILENT_MARKER) {
            Some(tail) => (tail, true),
            None => (after, false),
        };
        let silent = silent_before || silent_after;
        let extra_command = aliases.resolve(window).map(str::to_string);

        // Continuation lines belong to this annotation line even when it turns
        // out not to reference a known project.
        let start = i;
        while i < lines.len() && !lines[i].contains(MARKER) {
            i += 1;
        }
        let comment = join_comment(&lines[start..i]);

        let Some(project) = match_project(projects, tail) else {
            continue;
        };
        // TODO: support `#TP1-1 Fixed #TP1-2 Fixed`; only the first mention
        // on a line is applied today.
        let Some((issue, command)) = split_issue_and_command(project, tail) else {
            continue;
        };

        annotations.push(ParsedAnnotation {
            issue,
            command,
            comment,
            silent,
            extra_command,
        });
    }

    annotations
}

/// First project, in registry order, whose `<short>-` starts the tail.
fn match_project<'a>(projects: &'a ProjectRegistry, tail: &str) -> Option<&'a Project> {
    projects.iter().find(|p| {
        tail.strip_prefix(p.short_name.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    })
}

/// Split `SHORT-123 command text` into the issue and the command.
fn split_issue_and_command(project: &Project, tail: &str) -> Option<(IssueRef, String)> {
    let pattern = format!(r"^{}-([0-9]+)\s?(.*)$", regex::escape(&project.short_name));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(tail)?;
    let number = caps.get(1)?.as_str();
    let command = caps.get(2).map_or("", |m| m.as_str());
    Some((
        IssueRef::new(&project.short_name, number),
        command.to_string(),
    ))
}

fn join_comment(lines: &[&str]) -> Option<String> {
    let comment = lines.join("\n");
    let comment = comment.trim();
    if comment.is_empty() {
        None
    } else {
        Some(comment.to_string())
    }
}
