//! GitHub tracker client for Tidier.
//!
//! Provides the blocking REST/GraphQL client, the [`IssueTracker`] and
//! [`IssueCloser`] seams consumed by the triage engine, retry/backoff
//! transport helpers, and issue-locator parsing.

pub mod github_api_client;
mod github_transport_helpers;
pub mod github_types;
pub mod issue_closer;
pub mod issue_locator;
pub mod issue_tracker;

pub use github_api_client::{
    GithubApiClient, GithubClientConfig, IssueNode, DEFAULT_GITHUB_API_BASE,
    DEFAULT_GITHUB_GRAPHQL_URL,
};
pub use github_types::{IssueKind, IssueRef, IssueState, LabeledIssue, RepoRef};
pub use issue_closer::{closer_for_strategy, GraphqlMutationCloser, IssueCloser, RestEditCloser};
pub use issue_locator::IssueLocatorPattern;
pub use issue_tracker::{IssueTracker, TrackerError};
