//! Issue tracker access.
//!
//! The rest of the tool only talks to the tracker through [`IssueSource`],
//! which keeps the aggregation pipeline testable without a network.

pub mod bugzilla;

use crate::models::Issue;
use async_trait::async_trait;
use thiserror::Error;

pub use bugzilla::BugzillaClient;

/// Failure while fetching issues. Never retried by the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The tracker could not be reached or did not answer in time.
    #[error("network failure: {0}")]
    Network(String),

    /// The tracker rejected our credentials.
    #[error("authentication failure: {0}")]
    Auth(String),

    /// The tracker answered with something we could not decode.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The tracker reported an error of its own.
    #[error("tracker error {code}: {message}")]
    Api { code: i64, message: String },
}

/// What to search for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Components to match (any of).
    pub components: Vec<String>,
    /// Whiteboard substring.
    pub whiteboard: Option<String>,
    /// Bugs that the results must block.
    pub blocks: Vec<u64>,
    /// Explicit bug ids.
    pub ids: Vec<u64>,
}

impl SearchQuery {
    /// Query for an explicit list of bugs.
    pub fn by_ids(ids: Vec<u64>) -> Self {
        Self {
            ids,
            ..Self::default()
        }
    }

    /// Returns true if the query has no search terms at all.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
            && self.whiteboard.is_none()
            && self.blocks.is_empty()
            && self.ids.is_empty()
    }

    /// Human-readable list of the search values, used as the report title.
    pub fn describe(&self) -> String {
        let mut values: Vec<String> = self.components.clone();
        values.extend(self.whiteboard.iter().cloned());
        values.extend(self.blocks.iter().map(u64::to_string));
        values.extend(self.ids.iter().map(u64::to_string));
        values.join(", ")
    }
}

/// Something that can search for issues.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Run a search. An empty `Ok` vector means nothing matched.
    async fn search_issues(&self, query: &SearchQuery) -> Result<Vec<Issue>, FetchError>;

    /// Link to a single issue.
    fn issue_url(&self, id: u64) -> String;

    /// Link to a list of issues in the tracker UI.
    fn buglist_url(&self, ids: &[u64]) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_query() {
        let query = SearchQuery {
            components: vec!["Graphics".to_string(), "DOM".to_string()],
            whiteboard: Some("[e10s]".to_string()),
            blocks: vec![905436],
            ids: vec![],
        };
        assert_eq!(query.describe(), "Graphics, DOM, [e10s], 905436");
        assert!(!query.is_empty());
        assert!(SearchQuery::default().is_empty());
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Api {
            code: 51,
            message: "Unknown component".to_string(),
        };
        assert_eq!(err.to_string(), "tracker error 51: Unknown component");
    }
}
