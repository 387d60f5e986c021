use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::issue_tracker::TrackerError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Public struct `RepoRef` used across Tidier components.
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self, TrackerError> {
        let invalid = || TrackerError::UnexpectedShape {
            operation: "repository name".to_string(),
            detail: format!("'{raw}' is not in owner/repo form"),
        };
        let (owner, name) = raw.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identity of one issue or pull request: repository plus number.
pub struct IssueRef {
    pub repo: RepoRef,
    pub number: u64,
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Enumerates supported `IssueKind` values.
pub enum IssueKind {
    Issue,
    PullRequest,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issue => "Issue",
            Self::PullRequest => "Pull request",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Enumerates supported `IssueState` values.
pub enum IssueState {
    Open,
    Closed,
}

/// Issue or pull request returned by the label search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledIssue {
    pub issue: IssueRef,
    pub title: String,
    pub kind: IssueKind,
    pub state: IssueState,
    pub updated_at: DateTime<Utc>,
    pub labels: Vec<String>,
    /// Canonical API URL the repository name was derived from.
    pub locator: String,
}

impl LabeledIssue {
    pub fn repo_full_name(&self) -> String {
        self.issue.repo.full_name()
    }

    /// Label names compare case-insensitively on GitHub, beyond ASCII too.
    pub fn has_label(&self, label: &str) -> bool {
        let wanted = label.to_lowercase();
        self.labels
            .iter()
            .any(|candidate| candidate.to_lowercase() == wanted)
    }
}
