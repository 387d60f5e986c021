use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tidier_core::{CloseStrategyKind, RawConfig, TidierConfig};
use tidier_github_issues::{
    IssueCloser, IssueKind, IssueRef, IssueState, IssueTracker, LabeledIssue, RepoRef,
    TrackerError,
};

use crate::notifier::RunNotifier;

pub(crate) const TEST_LABEL: &str = "stale";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TrackerCall {
    Search(String),
    ViewerLogin,
    ListRepositories,
    IsCollaborator(String),
    Close(IssueRef),
    Comment(IssueRef, String),
    RemoveLabel(IssueRef, String),
}

impl TrackerCall {
    pub(crate) fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Close(_) | Self::Comment(_, _) | Self::RemoveLabel(_, _)
        )
    }
}

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .expect("fixed timestamp")
}

pub(crate) fn days_ago(days: i64) -> DateTime<Utc> {
    fixed_now() - Duration::days(days)
}

pub(crate) fn issue_ref(repo: &str, number: u64) -> IssueRef {
    IssueRef {
        repo: RepoRef::parse(repo).expect("repo"),
        number,
    }
}

pub(crate) fn labeled_issue(
    repo: &str,
    number: u64,
    state: IssueState,
    updated_at: DateTime<Utc>,
) -> LabeledIssue {
    LabeledIssue {
        issue: issue_ref(repo, number),
        title: format!("issue {number} in {repo}"),
        kind: IssueKind::Issue,
        state,
        updated_at,
        labels: vec![TEST_LABEL.to_string()],
        locator: format!("https://api.github.com/repos/{repo}/issues/{number}"),
    }
}

pub(crate) fn test_config(raw: RawConfig) -> TidierConfig {
    RawConfig {
        access_token: raw.access_token.or_else(|| Some("ghp_test".to_string())),
        label: raw.label.or_else(|| Some(TEST_LABEL.to_string())),
        ..raw
    }
    .validate()
    .expect("test config")
}

pub(crate) fn live_config() -> TidierConfig {
    test_config(RawConfig {
        for_real: Some("1".to_string()),
        ..RawConfig::default()
    })
}

/// In-memory tracker sharing one ordered call log with [`FakeCloser`].
/// A successful label removal takes the issue out of later searches.
#[derive(Default)]
pub(crate) struct FakeTracker {
    issues: RefCell<Vec<LabeledIssue>>,
    accessible: BTreeSet<String>,
    collaborator_on: BTreeSet<String>,
    failing_collaborator_checks: BTreeSet<String>,
    failing_comments: BTreeSet<u64>,
    failing_label_removals: BTreeSet<u64>,
    search_error: Option<String>,
    log: Rc<RefCell<Vec<TrackerCall>>>,
}

impl FakeTracker {
    pub(crate) fn with_issues(mut self, issues: Vec<LabeledIssue>) -> Self {
        self.issues = RefCell::new(issues);
        self
    }

    pub(crate) fn with_accessible(mut self, repos: &[&str]) -> Self {
        self.accessible = repos.iter().map(|repo| repo.to_string()).collect();
        self
    }

    pub(crate) fn with_collaborator_on(mut self, repos: &[&str]) -> Self {
        self.collaborator_on = repos.iter().map(|repo| repo.to_string()).collect();
        self
    }

    pub(crate) fn with_failing_collaborator_check(mut self, repo: &str) -> Self {
        self.failing_collaborator_checks.insert(repo.to_string());
        self
    }

    pub(crate) fn with_failing_comment(mut self, number: u64) -> Self {
        self.failing_comments.insert(number);
        self
    }

    pub(crate) fn with_failing_label_removal(mut self, number: u64) -> Self {
        self.failing_label_removals.insert(number);
        self
    }

    pub(crate) fn with_search_error(mut self, message: &str) -> Self {
        self.search_error = Some(message.to_string());
        self
    }

    pub(crate) fn closer(&self, strategy: CloseStrategyKind) -> FakeCloser {
        FakeCloser {
            strategy,
            failing_closes: BTreeSet::new(),
            log: Rc::clone(&self.log),
        }
    }

    pub(crate) fn calls(&self) -> Vec<TrackerCall> {
        self.log.borrow().clone()
    }

    pub(crate) fn mutations(&self) -> Vec<TrackerCall> {
        self.calls()
            .into_iter()
            .filter(TrackerCall::is_mutation)
            .collect()
    }

    fn record(&self, call: TrackerCall) {
        self.log.borrow_mut().push(call);
    }
}

fn injected_failure(operation: &str) -> TrackerError {
    TrackerError::HttpStatus {
        operation: operation.to_string(),
        status: 500,
        body: "injected failure".to_string(),
    }
}

impl IssueTracker for FakeTracker {
    fn search_issues_by_label(&self, label: &str) -> Result<Vec<LabeledIssue>, TrackerError> {
        self.record(TrackerCall::Search(label.to_string()));
        if let Some(locator) = &self.search_error {
            return Err(TrackerError::UnexpectedLocator {
                locator: locator.clone(),
            });
        }
        Ok(self
            .issues
            .borrow()
            .iter()
            .filter(|issue| issue.has_label(label))
            .cloned()
            .collect())
    }

    fn viewer_login(&self) -> Result<String, TrackerError> {
        self.record(TrackerCall::ViewerLogin);
        Ok("tidier-bot".to_string())
    }

    fn list_accessible_repositories(&self) -> Result<BTreeSet<String>, TrackerError> {
        self.record(TrackerCall::ListRepositories);
        Ok(self.accessible.clone())
    }

    fn is_collaborator(&self, repo: &RepoRef, _login: &str) -> Result<bool, TrackerError> {
        let full_name = repo.full_name();
        self.record(TrackerCall::IsCollaborator(full_name.clone()));
        if self.failing_collaborator_checks.contains(&full_name) {
            return Err(injected_failure("collaborator check"));
        }
        Ok(self.collaborator_on.contains(&full_name))
    }

    fn create_comment(&self, issue: &IssueRef, body: &str) -> Result<(), TrackerError> {
        self.record(TrackerCall::Comment(issue.clone(), body.to_string()));
        if self.failing_comments.contains(&issue.number) {
            return Err(injected_failure("create comment"));
        }
        Ok(())
    }

    fn remove_label(&self, issue: &IssueRef, label: &str) -> Result<(), TrackerError> {
        self.record(TrackerCall::RemoveLabel(issue.clone(), label.to_string()));
        if self.failing_label_removals.contains(&issue.number) {
            return Err(injected_failure("remove label"));
        }
        for stored in self.issues.borrow_mut().iter_mut() {
            if stored.issue == *issue {
                stored.labels.retain(|name| !name.eq_ignore_ascii_case(label));
            }
        }
        Ok(())
    }
}

pub(crate) struct FakeCloser {
    strategy: CloseStrategyKind,
    failing_closes: BTreeSet<u64>,
    log: Rc<RefCell<Vec<TrackerCall>>>,
}

impl FakeCloser {
    pub(crate) fn with_failing_close(mut self, number: u64) -> Self {
        self.failing_closes.insert(number);
        self
    }
}

impl IssueCloser for FakeCloser {
    fn strategy(&self) -> CloseStrategyKind {
        self.strategy
    }

    fn close_issue(&self, issue: &IssueRef) -> Result<(), TrackerError> {
        self.log.borrow_mut().push(TrackerCall::Close(issue.clone()));
        if self.failing_closes.contains(&issue.number) {
            return Err(injected_failure("close issue"));
        }
        Ok(())
    }
}

/// Records pinged URLs and answers with a fixed result.
pub(crate) struct FakeNotifier {
    response: Result<u16, String>,
    pinged: RefCell<Vec<String>>,
}

impl FakeNotifier {
    pub(crate) fn responding(response: Result<u16, String>) -> Self {
        Self {
            response,
            pinged: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn pinged(&self) -> Vec<String> {
        self.pinged.borrow().clone()
    }
}

impl Default for FakeNotifier {
    fn default() -> Self {
        Self::responding(Ok(200))
    }
}

impl RunNotifier for FakeNotifier {
    fn ping(&self, url: &str) -> Result<u16, String> {
        self.pinged.borrow_mut().push(url.to_string());
        self.response.clone()
    }
}
