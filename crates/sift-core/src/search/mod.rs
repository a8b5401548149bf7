//! External search index access and result normalization.

mod exa;
mod format;

pub use exa::{normalize_exa_results, ExaClient};
pub use format::{format_results_for_llm, NO_RESULTS};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::Retryable;

/// A provider-independent search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub relevance_score: Option<f64>,
}

/// One dispatched web research query.
///
/// `task_id` is unique within a run and seeds the short URLs of every source
/// the task finds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchTask {
    pub query: String,
    pub task_id: usize,
}

impl SearchTask {
    pub fn new(query: impl Into<String>, task_id: usize) -> Self {
        Self {
            query: query.into(),
            task_id,
        }
    }
}

/// Errors from the external search index.
///
/// These never leave the provider layer; they become an empty, annotated result.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Search API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse search response: {0}")]
    Parse(String),
}

impl Retryable for SearchError {
    fn is_retryable(&self) -> bool {
        match self {
            SearchError::Request(_) => true,
            SearchError::Status { status, .. } => *status == 429 || *status >= 500,
            SearchError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Request(err.to_string())
    }
}

/// An index that answers a query with ranked documents.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>, SearchError>;
}

#[async_trait]
impl SearchIndex for Box<dyn SearchIndex> {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        (**self).search(query, num_results).await
    }
}
