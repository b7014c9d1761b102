//! Web search provider trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One organic search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Trait for web search backends
///
/// Implementations:
/// - `SerpApiClient`: SerpAPI Google results
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Run a query and return up to `limit` hits
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
