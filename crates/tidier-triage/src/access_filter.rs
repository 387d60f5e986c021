use std::collections::{BTreeMap, BTreeSet};

use tidier_core::TidierConfig;
use tidier_github_issues::{IssueTracker, LabeledIssue, RepoRef};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Enumerates supported `RepositoryDecision` values.
pub enum RepositoryDecision {
    Admitted,
    /// The acting identity cannot see the repository.
    ExcludedByOwnership,
    ExcludedByInclude,
    ExcludedByExclude,
    ExcludedByCollaboration,
    CollaboratorCheckFailed { message: String },
}

impl RepositoryDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Labeled issues of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryGroup {
    pub repo: RepoRef,
    pub issues: Vec<LabeledIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `RepositoryVerdict` used across Tidier components.
pub struct RepositoryVerdict {
    pub repo_full_name: String,
    pub decision: RepositoryDecision,
}

#[derive(Debug, Clone, Default)]
/// Public struct `AccessFilterResult` used across Tidier components.
pub struct AccessFilterResult {
    pub verdicts: Vec<RepositoryVerdict>,
    pub admitted: Vec<RepositoryGroup>,
}

/// Collaborator check applied when closing needs write access.
pub struct CollaboratorGate<'a> {
    pub tracker: &'a dyn IssueTracker,
    pub login: &'a str,
}

pub fn group_issues_by_repository(issues: Vec<LabeledIssue>) -> Vec<RepositoryGroup> {
    let mut grouped: BTreeMap<RepoRef, Vec<LabeledIssue>> = BTreeMap::new();
    for issue in issues {
        grouped
            .entry(issue.issue.repo.clone())
            .or_default()
            .push(issue);
    }
    grouped
        .into_iter()
        .map(|(repo, issues)| RepositoryGroup { repo, issues })
        .collect()
}

/// Gates run in order (visibility, include, exclude, collaborator); the
/// first rejecting gate ends evaluation for that repository.
pub fn filter_repositories(
    groups: Vec<RepositoryGroup>,
    accessible: &BTreeSet<String>,
    config: &TidierConfig,
    gate: Option<&CollaboratorGate<'_>>,
) -> AccessFilterResult {
    let mut result = AccessFilterResult::default();
    for group in groups {
        let repo_full_name = group.repo.full_name();
        let decision = decide_repository(&group, &repo_full_name, accessible, config, gate);
        debug!(repo = %repo_full_name, ?decision, "repository access decision");
        if decision.is_admitted() {
            result.admitted.push(group);
        }
        result.verdicts.push(RepositoryVerdict {
            repo_full_name,
            decision,
        });
    }
    result
}

fn decide_repository(
    group: &RepositoryGroup,
    repo_full_name: &str,
    accessible: &BTreeSet<String>,
    config: &TidierConfig,
    gate: Option<&CollaboratorGate<'_>>,
) -> RepositoryDecision {
    if !accessible.contains(repo_full_name) {
        return RepositoryDecision::ExcludedByOwnership;
    }
    if !config.include().full_match(repo_full_name) {
        return RepositoryDecision::ExcludedByInclude;
    }
    if config.exclude().full_match(repo_full_name) {
        return RepositoryDecision::ExcludedByExclude;
    }
    if let Some(gate) = gate {
        let representative = group
            .issues
            .first()
            .map(|issue| &issue.issue.repo)
            .unwrap_or(&group.repo);
        match gate.tracker.is_collaborator(representative, gate.login) {
            Ok(true) => {}
            Ok(false) => return RepositoryDecision::ExcludedByCollaboration,
            Err(error) => {
                warn!(repo = %repo_full_name, %error, "collaborator check failed");
                return RepositoryDecision::CollaboratorCheckFailed {
                    message: error.to_string(),
                };
            }
        }
    }
    RepositoryDecision::Admitted
}
