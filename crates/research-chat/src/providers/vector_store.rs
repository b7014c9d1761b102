//! Vector index provider trait for hosted similarity search

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Similarity metric fixed at index creation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::DotProduct => "dotproduct",
        };
        f.write_str(name)
    }
}

/// Name, dimensionality and metric of an index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, dimension: usize, metric: Metric) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric,
        }
    }

    /// Same dimensionality and metric
    pub fn is_compatible(&self, other: &IndexSpec) -> bool {
        self.dimension == other.dimension && self.metric == other.metric
    }
}

/// A vector with its id and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Search result from the vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    /// Similarity score, higher is more similar
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Trait for a named-index vector database
///
/// Implementations:
/// - `PineconeIndex`: Pinecone serverless REST API
/// - `InMemoryIndex`: process-local brute force search
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// List existing indexes
    async fn list_indexes(&self) -> Result<Vec<IndexSpec>>;

    /// Create an index; creating one that already exists is not an error
    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    /// Insert or overwrite vectors, returning how many were written
    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<usize>;

    /// Top-k most similar vectors, best first
    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
