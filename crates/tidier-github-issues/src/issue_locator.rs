use regex::Regex;

use crate::github_types::RepoRef;
use crate::issue_tracker::TrackerError;

/// Matches canonical issue API URLs (`{api_base}/repos/{owner}/{repo}/issues/{n}`)
/// and extracts the repository full name.
#[derive(Debug, Clone)]
pub struct IssueLocatorPattern {
    pattern: Regex,
}

impl IssueLocatorPattern {
    pub fn for_api_base(api_base: &str) -> Result<Self, regex::Error> {
        let base = regex::escape(api_base.trim_end_matches('/'));
        let pattern = Regex::new(&format!("^{base}/repos/([^/]+/[^/]+)/issues/[0-9]+$"))?;
        Ok(Self { pattern })
    }

    /// A locator that does not match is a protocol-shape violation in the
    /// tracker response, never a business case.
    pub fn repo_ref(&self, locator: &str) -> Result<RepoRef, TrackerError> {
        let unexpected = || TrackerError::UnexpectedLocator {
            locator: locator.to_string(),
        };
        let full_name = self
            .pattern
            .captures(locator)
            .and_then(|captures| captures.get(1))
            .ok_or_else(unexpected)?;
        RepoRef::parse(full_name.as_str()).map_err(|_| unexpected())
    }
}
