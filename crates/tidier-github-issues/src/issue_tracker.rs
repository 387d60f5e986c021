use std::collections::BTreeSet;

use thiserror::Error;

use crate::github_types::{IssueRef, LabeledIssue, RepoRef};

#[derive(Debug, Error)]
/// Enumerates supported `TrackerError` values.
pub enum TrackerError {
    #[error("failed to build github client: {0}")]
    ClientBuild(String),
    #[error("github api {operation} request failed: {source}")]
    Http {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("github api {operation} failed with status {status}: {body}")]
    HttpStatus {
        operation: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode github {operation}: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("github graphql {operation} returned errors: {message}")]
    GraphQl { operation: String, message: String },
    #[error("unexpected issue locator from github api: {locator}")]
    UnexpectedLocator { locator: String },
    #[error("unexpected github {operation} response: {detail}")]
    UnexpectedShape { operation: String, detail: String },
}

/// Operations the triage engine needs from the issue tracker.
///
/// Every call may fail with a [`TrackerError`]; callers scope the failure to
/// the issue or repository being processed.
pub trait IssueTracker {
    /// All open and closed issues and pull requests carrying `label`.
    fn search_issues_by_label(&self, label: &str) -> Result<Vec<LabeledIssue>, TrackerError>;

    /// Login of the identity the credential belongs to.
    fn viewer_login(&self) -> Result<String, TrackerError>;

    /// Full names of every repository the acting identity can see.
    fn list_accessible_repositories(&self) -> Result<BTreeSet<String>, TrackerError>;

    fn is_collaborator(&self, repo: &RepoRef, login: &str) -> Result<bool, TrackerError>;

    fn create_comment(&self, issue: &IssueRef, body: &str) -> Result<(), TrackerError>;

    fn remove_label(&self, issue: &IssueRef, label: &str) -> Result<(), TrackerError>;
}
