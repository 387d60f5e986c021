use std::cell::RefCell;
use std::collections::HashMap;

use tidier_core::CloseStrategyKind;
use tracing::debug;

use crate::github_api_client::{GithubApiClient, IssueNode};
use crate::github_types::IssueRef;
use crate::issue_tracker::TrackerError;

/// Closing capability, selected per deployment.
pub trait IssueCloser {
    fn strategy(&self) -> CloseStrategyKind;

    fn close_issue(&self, issue: &IssueRef) -> Result<(), TrackerError>;
}

/// Closes through the REST issue edit endpoint. Needs write access, so the
/// triage engine also gates repositories on collaborator status.
pub struct RestEditCloser<'a> {
    client: &'a GithubApiClient,
}

impl<'a> RestEditCloser<'a> {
    pub fn new(client: &'a GithubApiClient) -> Self {
        Self { client }
    }
}

impl IssueCloser for RestEditCloser<'_> {
    fn strategy(&self) -> CloseStrategyKind {
        CloseStrategyKind::RestEdit
    }

    fn close_issue(&self, issue: &IssueRef) -> Result<(), TrackerError> {
        self.client.close_issue_by_edit(issue)
    }
}

/// Resolves the GraphQL node id (cached per issue) and closes through a
/// mutation, which GitHub allows with triage-level access.
pub struct GraphqlMutationCloser<'a> {
    client: &'a GithubApiClient,
    node_ids: RefCell<HashMap<IssueRef, IssueNode>>,
}

impl<'a> GraphqlMutationCloser<'a> {
    pub fn new(client: &'a GithubApiClient) -> Self {
        Self {
            client,
            node_ids: RefCell::new(HashMap::new()),
        }
    }

    fn node_for(&self, issue: &IssueRef) -> Result<IssueNode, TrackerError> {
        if let Some(node) = self.node_ids.borrow().get(issue) {
            debug!(issue = %issue, "node id cache hit");
            return Ok(node.clone());
        }
        let node = self.client.resolve_issue_node(issue)?;
        self.node_ids
            .borrow_mut()
            .insert(issue.clone(), node.clone());
        Ok(node)
    }
}

impl IssueCloser for GraphqlMutationCloser<'_> {
    fn strategy(&self) -> CloseStrategyKind {
        CloseStrategyKind::GraphqlMutation
    }

    fn close_issue(&self, issue: &IssueRef) -> Result<(), TrackerError> {
        let node = self.node_for(issue)?;
        self.client.close_issue_node(&node)
    }
}

pub fn closer_for_strategy(
    client: &GithubApiClient,
    strategy: CloseStrategyKind,
) -> Box<dyn IssueCloser + '_> {
    match strategy {
        CloseStrategyKind::GraphqlMutation => Box::new(GraphqlMutationCloser::new(client)),
        CloseStrategyKind::RestEdit => Box::new(RestEditCloser::new(client)),
    }
}
