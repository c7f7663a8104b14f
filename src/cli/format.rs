//! Output formatting for CLI display.

use crate::model::{BuildReport, BuildResult, CommandResult, CommandStatus, IssueRef};

/// One line per tracker action, e.g. `ok      TP1-1  Fixed`.
pub(super) fn format_command(result: &CommandResult) -> String {
    let status = match result.status {
        CommandStatus::Ok => "ok",
        CommandStatus::Failed => "failed",
        CommandStatus::NotLoggedIn => "no-login",
    };
    let target = result.issue_id.as_deref().unwrap_or("-");
    let mut line = format!("{status:<8}{target}  {}", result.command);
    if let Some(response) = result.response.as_deref().filter(|r| !r.is_empty()) {
        line.push_str(&format!(" ({response})"));
    }
    line
}

pub(super) fn format_result(result: BuildResult) -> &'static str {
    match result {
        BuildResult::Success => "success",
        BuildResult::Unstable => "unstable",
        BuildResult::Failure => "failure",
    }
}

/// Short summary of a build report.
pub(super) fn format_report(report: &BuildReport) -> String {
    let mut summary = format!(
        "{} action(s), {} failed, {} issue(s) fixed; build {}",
        report.commands.len(),
        report.failed_commands(),
        report.fixed_issues.len(),
        format_result(report.result),
    );
    if !report.fixed_issues.is_empty() {
        let fixed: Vec<&str> = report.fixed_issues.iter().map(IssueRef::as_str).collect();
        summary.push_str(&format!("\nFixed: {}", fixed.join(", ")));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;

    fn result(status: CommandStatus, response: Option<&str>) -> CommandResult {
        CommandResult {
            site_name: "youtrack".into(),
            issue_id: Some("TP1-1".into()),
            username: None,
            comment: None,
            command: "Fixed".into(),
            response: response.map(String::from),
            status,
            group: None,
            date: Timestamp::now(),
            silent: false,
        }
    }

    #[test]
    fn formats_command_lines() {
        assert_eq!(
            format_command(&result(CommandStatus::Ok, None)),
            "ok      TP1-1  Fixed"
        );
        assert_eq!(
            format_command(&result(CommandStatus::Failed, Some("unknown command"))),
            "failed  TP1-1  Fixed (unknown command)"
        );
    }

    #[test]
    fn formats_report_summary() {
        let report = BuildReport {
            commands: vec![
                result(CommandStatus::Ok, None),
                result(CommandStatus::NotLoggedIn, None),
            ],
            fixed_issues: vec![IssueRef::new("TP1", "1")],
            result: BuildResult::Unstable,
        };
        assert_eq!(
            format_report(&report),
            "2 action(s), 1 failed, 1 issue(s) fixed; build unstable\nFixed: TP1-1"
        );
    }
}
