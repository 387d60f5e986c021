//! Triage engine for Tidier.
//!
//! Filters the repositories implicated by labeled issues, decides per issue
//! whether to close it or drop the label, performs the ordered
//! close/comment/unlabel sequence, and sends the optional post-run webhook.

pub mod access_filter;
pub mod action_executor;
pub mod notifier;
pub mod run_report;
pub mod triage_run;

#[cfg(test)]
mod test_support;

pub use access_filter::{
    filter_repositories, group_issues_by_repository, AccessFilterResult, CollaboratorGate,
    RepositoryDecision, RepositoryGroup, RepositoryVerdict,
};
pub use action_executor::{
    execute_issue_action, ActionContext, ActionFailure, ActionOutcome, ActionStep, IssueReport,
};
pub use notifier::{notify_after_run, NotificationOutcome, RunNotifier, WebhookNotifier};
pub use run_report::{render_config_summary, render_run_report, render_timestamp};
pub use triage_run::{run_triage, RepositoryRun, RunExit, RunReport, TriageError, TriageServices};
