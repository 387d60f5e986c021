use chrono::{DateTime, Utc};
use thiserror::Error;
use tidier_core::{CloseStrategyKind, TidierConfig};
use tidier_github_issues::{IssueCloser, IssueTracker, TrackerError};
use tracing::info;

use crate::access_filter::{
    filter_repositories, group_issues_by_repository, CollaboratorGate, RepositoryVerdict,
};
use crate::action_executor::{execute_issue_action, ActionContext, IssueReport};
use crate::notifier::{notify_after_run, NotificationOutcome, RunNotifier};

/// Collaborators of one triage run.
pub struct TriageServices<'a> {
    pub tracker: &'a dyn IssueTracker,
    pub closer: &'a dyn IssueCloser,
    pub notifier: &'a dyn RunNotifier,
}

#[derive(Debug, Error)]
/// Run-level failures. Per-repository and per-issue failures never surface
/// here; they are recorded in the [`RunReport`].
pub enum TriageError {
    #[error("unexpected error response from GitHub API: {locator}")]
    ProtocolShape { locator: String },
    #[error("failed to search issues labeled \"{label}\": {source}")]
    Search {
        label: String,
        #[source]
        source: TrackerError,
    },
    #[error("failed to resolve acting identity: {0}")]
    ResolveIdentity(#[source] TrackerError),
    #[error("failed to list accessible repositories: {0}")]
    ListRepositories(#[source] TrackerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `RunExit` values.
pub enum RunExit {
    Completed,
    NoIssuesFound,
    NoRepositoriesFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `RepositoryRun` used across Tidier components.
pub struct RepositoryRun {
    pub repo_full_name: String,
    pub issues: Vec<IssueReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `RunReport` used across Tidier components.
pub struct RunReport {
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub exit: RunExit,
    pub issues_found: usize,
    pub verdicts: Vec<RepositoryVerdict>,
    pub repositories: Vec<RepositoryRun>,
    /// `None` when the run ended before the notification phase.
    pub notification: Option<NotificationOutcome>,
}

impl RunReport {
    fn new(label: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            label: label.to_string(),
            started_at,
            exit: RunExit::Completed,
            issues_found: 0,
            verdicts: Vec::new(),
            repositories: Vec::new(),
            notification: None,
        }
    }

    pub fn issue_reports(&self) -> impl Iterator<Item = &IssueReport> {
        self.repositories
            .iter()
            .flat_map(|repository| repository.issues.iter())
    }

    pub fn failed_issue_count(&self) -> usize {
        self.issue_reports()
            .filter(|report| report.is_failure())
            .count()
    }
}

/// Executes one triage pass. `now` is sampled once by the caller and used for
/// every staleness computation in the run.
pub fn run_triage(
    services: &TriageServices<'_>,
    config: &TidierConfig,
    now: DateTime<Utc>,
) -> Result<RunReport, TriageError> {
    let mut report = RunReport::new(config.label(), now);

    info!(label = config.label(), "searching labeled issues");
    let issues = services
        .tracker
        .search_issues_by_label(config.label())
        .map_err(|error| match error {
            TrackerError::UnexpectedLocator { locator } => TriageError::ProtocolShape { locator },
            source => TriageError::Search {
                label: config.label().to_string(),
                source,
            },
        })?;
    if issues.is_empty() {
        info!("no labeled issues found");
        report.exit = RunExit::NoIssuesFound;
        return Ok(report);
    }
    report.issues_found = issues.len();
    let groups = group_issues_by_repository(issues);

    let accessible = services
        .tracker
        .list_accessible_repositories()
        .map_err(TriageError::ListRepositories)?;
    if accessible.is_empty() {
        info!("no accessible repositories found");
        report.exit = RunExit::NoRepositoriesFound;
        return Ok(report);
    }

    let login = match services.closer.strategy() {
        CloseStrategyKind::RestEdit => Some(
            services
                .tracker
                .viewer_login()
                .map_err(TriageError::ResolveIdentity)?,
        ),
        CloseStrategyKind::GraphqlMutation => None,
    };
    let gate = login.as_deref().map(|login| CollaboratorGate {
        tracker: services.tracker,
        login,
    });
    let filtered = filter_repositories(groups, &accessible, config, gate.as_ref());
    report.verdicts = filtered.verdicts;

    let ctx = ActionContext {
        tracker: services.tracker,
        closer: services.closer,
        config,
        now,
    };
    for group in filtered.admitted {
        let issues = group
            .issues
            .iter()
            .map(|issue| execute_issue_action(&ctx, issue))
            .collect();
        report.repositories.push(RepositoryRun {
            repo_full_name: group.repo.full_name(),
            issues,
        });
    }

    report.notification = Some(notify_after_run(services.notifier, config));
    info!(
        repositories = report.repositories.len(),
        failed = report.failed_issue_count(),
        "triage run finished"
    );
    Ok(report)
}
