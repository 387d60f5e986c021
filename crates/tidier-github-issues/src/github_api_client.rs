use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::github_transport_helpers::{
    is_rejected_before_processing, is_retryable_github_status, is_retryable_transport_error,
    parse_retry_after, retry_delay, truncate_for_error,
};
use crate::github_types::{IssueKind, IssueRef, IssueState, LabeledIssue, RepoRef};
use crate::issue_locator::IssueLocatorPattern;
use crate::issue_tracker::{IssueTracker, TrackerError};

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
const PAGE_SIZE: usize = 100;
/// GitHub stops serving search results past this many items.
const SEARCH_RESULT_CAP: usize = 1_000;
const ERROR_BODY_MAX_CHARS: usize = 800;

/// Which failures [`GithubApiClient::send`] may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryPolicy {
    /// Repeating the request cannot change the outcome: reads, closes, label removal.
    Idempotent,
    /// Only failures GitHub reports before acting on the request (rate limits,
    /// refused connections); a timeout or 5xx may hide a stored write.
    UnprocessedOnly,
}

const RESOLVE_NODE_QUERY: &str = r#"
query($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) {
    issueOrPullRequest(number: $number) {
      __typename
      ... on Issue {
        id
      }
      ... on PullRequest {
        id
      }
    }
  }
}
"#;

const CLOSE_ISSUE_MUTATION: &str = r#"
mutation($id: ID!) {
  closeIssue(input: {issueId: $id, stateReason: NOT_PLANNED}) {
    clientMutationId
  }
}
"#;

const CLOSE_PULL_REQUEST_MUTATION: &str = r#"
mutation($id: ID!) {
  closePullRequest(input: {pullRequestId: $id}) {
    clientMutationId
  }
}
"#;

#[derive(Debug, Clone)]
/// Public struct `GithubClientConfig` used across Tidier components.
pub struct GithubClientConfig {
    pub api_base: String,
    pub graphql_url: String,
    pub token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl GithubClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            graphql_url: DEFAULT_GITHUB_GRAPHQL_URL.to_string(),
            token: token.into(),
            request_timeout_ms: 30_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

/// Node id and GraphQL type of an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueNode {
    pub id: String,
    pub kind: IssueKind,
}

#[derive(Debug, Deserialize)]
struct SearchIssuesPage {
    total_count: u64,
    #[serde(default)]
    incomplete_results: bool,
    items: Vec<SearchIssueItem>,
}

#[derive(Debug, Deserialize)]
struct SearchIssueItem {
    url: String,
    number: u64,
    title: String,
    state: IssueState,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    labels: Vec<SearchIssueLabel>,
    #[serde(default)]
    pull_request: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchIssueLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RepositorySummary {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
}

/// Blocking GitHub REST and GraphQL client with bounded retries.
pub struct GithubApiClient {
    http: Client,
    api_base: Url,
    graphql_url: Url,
    locator_pattern: IssueLocatorPattern,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl GithubApiClient {
    pub fn new(config: &GithubClientConfig) -> Result<Self, TrackerError> {
        let api_base = Url::parse(config.api_base.trim_end_matches('/')).map_err(|error| {
            TrackerError::ClientBuild(format!("invalid api base '{}': {error}", config.api_base))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(TrackerError::ClientBuild(format!(
                "api base '{}' cannot carry a path",
                config.api_base
            )));
        }
        let graphql_url = Url::parse(&config.graphql_url).map_err(|error| {
            TrackerError::ClientBuild(format!(
                "invalid graphql url '{}': {error}",
                config.graphql_url
            ))
        })?;
        let locator_pattern = IssueLocatorPattern::for_api_base(&config.api_base)
            .map_err(|error| TrackerError::ClientBuild(error.to_string()))?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("tidier"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", config.token.trim());
        let mut auth_value = reqwest::header::HeaderValue::from_str(&auth_header).map_err(|_| {
            TrackerError::ClientBuild("invalid github authorization header".to_string())
        })?;
        auth_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|error| TrackerError::ClientBuild(error.to_string()))?;
        Ok(Self {
            http,
            api_base,
            graphql_url,
            locator_pattern,
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    /// PATCH the issue state to closed. Needs write access on the repository.
    pub fn close_issue_by_edit(&self, issue: &IssueRef) -> Result<(), TrackerError> {
        let url = self.issue_endpoint(issue, &[])?;
        let payload = json!({ "state": "closed", "state_reason": "not_planned" });
        self.send("close issue", RetryPolicy::Idempotent, &[], || {
            self.http.patch(url.clone()).json(&payload)
        })?;
        Ok(())
    }

    pub fn resolve_issue_node(&self, issue: &IssueRef) -> Result<IssueNode, TrackerError> {
        #[derive(Deserialize)]
        struct ResolveData {
            repository: Option<RepositoryNode>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct RepositoryNode {
            issue_or_pull_request: Option<TypedNode>,
        }

        #[derive(Deserialize)]
        struct TypedNode {
            #[serde(rename = "__typename")]
            typename: String,
            id: String,
        }

        let data: ResolveData = self.graphql(
            "resolve issue node id",
            RESOLVE_NODE_QUERY,
            json!({
                "owner": issue.repo.owner,
                "repo": issue.repo.name,
                "number": issue.number,
            }),
        )?;
        let node = data
            .repository
            .and_then(|repository| repository.issue_or_pull_request)
            .ok_or_else(|| TrackerError::UnexpectedShape {
                operation: "resolve issue node id".to_string(),
                detail: format!("{issue} did not resolve to an issue or pull request"),
            })?;
        let kind = match node.typename.as_str() {
            "Issue" => IssueKind::Issue,
            "PullRequest" => IssueKind::PullRequest,
            other => {
                return Err(TrackerError::UnexpectedShape {
                    operation: "resolve issue node id".to_string(),
                    detail: format!("{issue} resolved to unsupported type {other}"),
                })
            }
        };
        debug!(issue = %issue, node_id = %node.id, "resolved issue node id");
        Ok(IssueNode { id: node.id, kind })
    }

    /// Close through GraphQL, which only needs triage access.
    pub fn close_issue_node(&self, node: &IssueNode) -> Result<(), TrackerError> {
        let (operation, mutation) = match node.kind {
            IssueKind::Issue => ("close issue", CLOSE_ISSUE_MUTATION),
            IssueKind::PullRequest => ("close pull request", CLOSE_PULL_REQUEST_MUTATION),
        };
        let _: Value = self.graphql(operation, mutation, json!({ "id": node.id }))?;
        Ok(())
    }

    fn labeled_issue_from_item(&self, item: SearchIssueItem) -> Result<LabeledIssue, TrackerError> {
        let repo = self.locator_pattern.repo_ref(&item.url)?;
        let kind = if item.pull_request.is_some() {
            IssueKind::PullRequest
        } else {
            IssueKind::Issue
        };
        Ok(LabeledIssue {
            issue: IssueRef {
                repo,
                number: item.number,
            },
            title: item.title,
            kind,
            state: item.state,
            updated_at: item.updated_at,
            labels: item.labels.into_iter().map(|label| label.name).collect(),
            locator: item.url,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TrackerError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                TrackerError::ClientBuild(format!("api base '{}' cannot carry a path", self.api_base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn issue_endpoint(&self, issue: &IssueRef, tail: &[&str]) -> Result<Url, TrackerError> {
        let number = issue.number.to_string();
        let mut segments = vec![
            "repos",
            issue.repo.owner.as_str(),
            issue.repo.name.as_str(),
            "issues",
            number.as_str(),
        ];
        segments.extend_from_slice(tail);
        self.endpoint(&segments)
    }

    fn graphql<T>(&self, operation: &str, query: &str, variables: Value) -> Result<T, TrackerError>
    where
        T: DeserializeOwned,
    {
        let payload = json!({ "query": query, "variables": variables });
        let response: GraphqlResponse<T> = self.request_json(operation, || {
            self.http.post(self.graphql_url.clone()).json(&payload)
        })?;
        if !response.errors.is_empty() {
            let message = response
                .errors
                .into_iter()
                .map(|entry| entry.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(TrackerError::GraphQl {
                operation: operation.to_string(),
                message,
            });
        }
        response.data.ok_or_else(|| TrackerError::UnexpectedShape {
            operation: operation.to_string(),
            detail: "response carried neither data nor errors".to_string(),
        })
    }

    fn request_json<T, F>(&self, operation: &str, request_builder: F) -> Result<T, TrackerError>
    where
        T: DeserializeOwned,
        F: FnMut() -> RequestBuilder,
    {
        let response = self.send(operation, RetryPolicy::Idempotent, &[], request_builder)?;
        let body = response.text().map_err(|source| TrackerError::Http {
            operation: operation.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| TrackerError::Decode {
            operation: operation.to_string(),
            source,
        })
    }

    /// Sends with retries on rate limits, server errors and transport
    /// failures, narrowed by `policy`. Statuses listed in `accepted` are
    /// returned to the caller instead of being treated as failures.
    fn send<F>(
        &self,
        operation: &str,
        policy: RetryPolicy,
        accepted: &[StatusCode],
        mut request_builder: F,
    ) -> Result<Response, TrackerError>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            match request_builder().send() {
                Ok(response) => {
                    let status = response.status();
                    let retry_after = parse_retry_after(response.headers());
                    if status.is_success() || (accepted.contains(&status) && retry_after.is_none())
                    {
                        return Ok(response);
                    }

                    let body = response.text().unwrap_or_default();
                    let retryable = match policy {
                        RetryPolicy::Idempotent => {
                            is_retryable_github_status(status.as_u16(), retry_after.is_some())
                        }
                        RetryPolicy::UnprocessedOnly => {
                            is_rejected_before_processing(status.as_u16(), retry_after.is_some())
                        }
                    };
                    if attempt < self.retry_max_attempts && retryable {
                        let delay = retry_delay(self.retry_base_delay_ms, attempt, retry_after);
                        warn!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying github request"
                        );
                        std::thread::sleep(delay);
                        continue;
                    }

                    return Err(TrackerError::HttpStatus {
                        operation: operation.to_string(),
                        status: status.as_u16(),
                        body: truncate_for_error(&body, ERROR_BODY_MAX_CHARS),
                    });
                }
                Err(error) => {
                    let retryable = match policy {
                        RetryPolicy::Idempotent => is_retryable_transport_error(&error),
                        RetryPolicy::UnprocessedOnly => error.is_connect(),
                    };
                    if attempt < self.retry_max_attempts && retryable {
                        let delay = retry_delay(self.retry_base_delay_ms, attempt, None);
                        warn!(operation, attempt, %error, "retrying github request");
                        std::thread::sleep(delay);
                        continue;
                    }
                    return Err(TrackerError::Http {
                        operation: operation.to_string(),
                        source: error,
                    });
                }
            }
        }
    }
}

impl IssueTracker for GithubApiClient {
    fn search_issues_by_label(&self, label: &str) -> Result<Vec<LabeledIssue>, TrackerError> {
        let url = self.endpoint(&["search", "issues"])?;
        let query = format!("label:\"{label}\"");
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: SearchIssuesPage = self.request_json("search issues", || {
                self.http.get(url.clone()).query(&[
                    ("q", query.as_str()),
                    ("per_page", "100"),
                    ("page", page_value.as_str()),
                ])
            })?;
            if chunk.incomplete_results {
                warn!(label, page, "github search returned incomplete results");
            }
            let chunk_len = chunk.items.len();
            for item in chunk.items {
                rows.push(self.labeled_issue_from_item(item)?);
            }
            let total = usize::try_from(chunk.total_count).unwrap_or(usize::MAX);
            if chunk_len < PAGE_SIZE || rows.len() >= total || rows.len() >= SEARCH_RESULT_CAP {
                break;
            }
            page = page.saturating_add(1);
        }
        debug!(label, count = rows.len(), "searched labeled issues");
        Ok(rows)
    }

    fn viewer_login(&self) -> Result<String, TrackerError> {
        #[derive(Deserialize)]
        struct Viewer {
            login: String,
        }

        let url = self.endpoint(&["user"])?;
        let viewer: Viewer = self.request_json("resolve viewer login", || self.http.get(url.clone()))?;
        Ok(viewer.login)
    }

    fn list_accessible_repositories(&self) -> Result<BTreeSet<String>, TrackerError> {
        let url = self.endpoint(&["user", "repos"])?;
        let mut page = 1_u32;
        let mut names = BTreeSet::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<RepositorySummary> = self.request_json("list repositories", || {
                self.http
                    .get(url.clone())
                    .query(&[("per_page", "100"), ("page", page_value.as_str())])
            })?;
            let chunk_len = chunk.len();
            names.extend(chunk.into_iter().map(|repo| repo.full_name));
            if chunk_len < PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        debug!(count = names.len(), "listed accessible repositories");
        Ok(names)
    }

    fn is_collaborator(&self, repo: &RepoRef, login: &str) -> Result<bool, TrackerError> {
        let url = self.endpoint(&[
            "repos",
            repo.owner.as_str(),
            repo.name.as_str(),
            "collaborators",
            login,
        ])?;
        // 403 means the identity lacks push access, so it cannot act as a collaborator.
        let response = self.send(
            "check collaborator",
            RetryPolicy::Idempotent,
            &[StatusCode::NOT_FOUND, StatusCode::FORBIDDEN],
            || self.http.get(url.clone()),
        )?;
        Ok(response.status().is_success())
    }

    fn create_comment(&self, issue: &IssueRef, body: &str) -> Result<(), TrackerError> {
        let url = self.issue_endpoint(issue, &["comments"])?;
        let payload = json!({ "body": body });
        self.send("create issue comment", RetryPolicy::UnprocessedOnly, &[], || {
            self.http.post(url.clone()).json(&payload)
        })?;
        Ok(())
    }

    fn remove_label(&self, issue: &IssueRef, label: &str) -> Result<(), TrackerError> {
        let url = self.issue_endpoint(issue, &["labels", label])?;
        self.send("remove issue label", RetryPolicy::Idempotent, &[], || {
            self.http.delete(url.clone())
        })?;
        Ok(())
    }
}
