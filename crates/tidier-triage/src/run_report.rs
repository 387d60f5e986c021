use chrono::{DateTime, Utc};
use tidier_core::TidierConfig;

use crate::access_filter::RepositoryDecision;
use crate::action_executor::{ActionOutcome, ActionStep, IssueReport};
use crate::notifier::NotificationOutcome;
use crate::triage_run::{RunExit, RunReport};

const COMMENT_WRAP_WIDTH: usize = 70;
const COMMENT_INDENT: &str = "    ";

/// Human-readable configuration block printed before every run.
pub fn render_config_summary(config: &TidierConfig) -> String {
    let webhook = match config.webhook() {
        Some(url) if !config.for_real() => format!("{url} (disabled)"),
        Some(url) => url.to_string(),
        None => "(none)".to_string(),
    };
    let mut lines = vec![
        "Configuration".to_string(),
        format!("  label: {}", config.label()),
        format!("  include regex: {}", config.include().as_str()),
        format!("  exclude regex: {}", config.exclude().as_str()),
        format!("  number of days before closing: {}", config.num_days()),
        format!(
            "  for real: {}",
            if config.for_real() { "yes" } else { "no" }
        ),
        format!("  webhook: {webhook}"),
        format!("  close strategy: {}", config.close_strategy()),
        "  comment text:".to_string(),
    ];
    lines.extend(
        wrap_words(config.comment_text(), COMMENT_WRAP_WIDTH)
            .into_iter()
            .map(|line| format!("{COMMENT_INDENT}{line}")),
    );
    lines.push(String::new());
    join_lines(lines)
}

pub fn render_timestamp(now: DateTime<Utc>) -> String {
    join_lines(vec![
        "Timestamp".to_string(),
        format!("  {}", now.format("%Y-%m-%d %H:%M:%S%.6f%:z")),
        String::new(),
    ])
}

/// Renders the search, permission, processing, and webhook sections.
pub fn render_run_report(report: &RunReport) -> String {
    let mut lines = vec![format!(
        "Search for issues with label \"{}\"",
        report.label
    )];
    if report.exit == RunExit::NoIssuesFound {
        lines.push("  No issues found".to_string());
        push_done(&mut lines, report);
        return join_lines(lines);
    }

    lines.push("Retrieve list of repositories to which you have access".to_string());
    if report.exit == RunExit::NoRepositoriesFound {
        lines.push("  No repositories found".to_string());
        push_done(&mut lines, report);
        return join_lines(lines);
    }

    lines.push(String::new());
    lines.push("Check your permissions on the repositories".to_string());
    for verdict in &report.verdicts {
        let line = match &verdict.decision {
            RepositoryDecision::ExcludedByOwnership => continue,
            RepositoryDecision::Admitted => "--> Including: all checks passed".to_string(),
            RepositoryDecision::ExcludedByInclude => {
                "    Excluding: does not match include regex".to_string()
            }
            RepositoryDecision::ExcludedByExclude => {
                "    Excluding: matches exclude regex".to_string()
            }
            RepositoryDecision::ExcludedByCollaboration => {
                "    Excluding: you are not a collaborator".to_string()
            }
            RepositoryDecision::CollaboratorCheckFailed { message } => {
                format!("    Excluding: collaborator check failed ({message})")
            }
        };
        lines.push(format!("  Repository {}", verdict.repo_full_name));
        lines.push(line);
    }
    lines.push(String::new());

    lines.push("Process issues and pull requests".to_string());
    for repository in &report.repositories {
        lines.push(format!("  Repository {}", repository.repo_full_name));
        for issue in &repository.issues {
            push_issue_lines(&mut lines, issue);
        }
    }

    match &report.notification {
        None | Some(NotificationOutcome::NotConfigured) => {}
        Some(NotificationOutcome::SkippedDryRun { url }) => {
            lines.push(String::new());
            lines.push(format!("Webhook {url}"));
            lines.push("  Skipping".to_string());
        }
        Some(NotificationOutcome::Delivered { url, status }) => {
            lines.push(String::new());
            lines.push(format!("Webhook {url}"));
            lines.push(format!("  Response [{status}]"));
        }
        Some(NotificationOutcome::Failed { url, message }) => {
            lines.push(String::new());
            lines.push(format!("Webhook {url}"));
            lines.push(format!("  Failed: {message}"));
        }
    }

    push_done(&mut lines, report);
    join_lines(lines)
}

fn push_issue_lines(lines: &mut Vec<String>, issue: &IssueReport) {
    lines.push(format!(
        "    {} #{}: {}",
        issue.kind.as_str(),
        issue.issue.number,
        issue.title
    ));
    let age = issue.age_days;
    match &issue.result {
        Ok(ActionOutcome::ClosedWithComment) => {
            lines.push(format!("      Closing: {age} days since last activity"));
        }
        Ok(ActionOutcome::WouldClose) => {
            lines.push(format!("----> Would close: {age} days since last activity"));
        }
        Ok(ActionOutcome::NotYetStale) => {
            lines.push(format!("      Not closing: {age} days since last activity"));
        }
        Ok(ActionOutcome::LabelRemovedFromClosed) => {
            lines.push("      Removing label: already closed".to_string());
        }
        Ok(ActionOutcome::WouldRemoveLabel) => {
            lines.push("----> Would remove label: already closed".to_string());
        }
        Ok(ActionOutcome::NoOp) => {
            lines.push("      Nothing to do: already closed and unlabeled".to_string());
        }
        Err(failure) => {
            if failure.step == ActionStep::RemoveLabel && failure.completed.is_empty() {
                lines.push("      Removing label: already closed".to_string());
            } else {
                lines.push(format!("      Closing: {age} days since last activity"));
            }
            lines.push(format!(
                "      Failed to {}: {}",
                failure.step.as_str(),
                failure.message
            ));
        }
    }
}

fn push_done(lines: &mut Vec<String>, report: &RunReport) {
    lines.push(String::new());
    let failed = report.failed_issue_count();
    if failed > 0 {
        lines.push(format!("{failed} issue(s) could not be fully processed"));
    }
    lines.push("Done!".to_string());
}

fn join_lines(lines: Vec<String>) -> String {
    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}

/// Greedy word wrap; words longer than `width` get a line of their own.
fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut wrapped = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            wrapped.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        wrapped.push(current);
    }
    wrapped
}
