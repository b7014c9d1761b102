//! Process-local vector index
//!
//! Brute force scoring over every stored vector. Used for local runs without a
//! Pinecone account and as the backend in tests. Contents are lost on restart.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};

use super::vector_store::{IndexSpec, Metric, VectorMatch, VectorRecord, VectorStoreProvider};

struct MemoryIndex {
    spec: IndexSpec,
    records: HashMap<String, VectorRecord>,
}

/// In-memory vector store keyed by index name
#[derive(Default)]
pub struct InMemoryIndex {
    indexes: RwLock<HashMap<String, MemoryIndex>>,
    creations: AtomicUsize,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexes actually created (existing-name calls excluded)
    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    /// Number of vectors stored in an index
    pub fn len(&self, index: &str) -> usize {
        self.indexes
            .read()
            .get(index)
            .map(|i| i.records.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f32]) -> f32 {
    dot(a, a).sqrt()
}

/// Higher is more similar for every metric
pub(crate) fn score(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::Cosine => {
            let denom = norm(a) * norm(b);
            if denom == 0.0 {
                0.0
            } else {
                dot(a, b) / denom
            }
        }
        Metric::DotProduct => dot(a, b),
        Metric::Euclidean => {
            let dist: f32 = a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt();
            1.0 / (1.0 + dist)
        }
    }
}

#[async_trait]
impl VectorStoreProvider for InMemoryIndex {
    async fn list_indexes(&self) -> Result<Vec<IndexSpec>> {
        let mut specs: Vec<IndexSpec> = self
            .indexes
            .read()
            .values()
            .map(|i| i.spec.clone())
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(specs)
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let mut indexes = self.indexes.write();
        if indexes.contains_key(&spec.name) {
            tracing::info!("Index {} already exists.", spec.name);
            return Ok(());
        }
        indexes.insert(
            spec.name.clone(),
            MemoryIndex {
                spec: spec.clone(),
                records: HashMap::new(),
            },
        );
        self.creations.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Created index: {}", spec.name);
        Ok(())
    }

    async fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<usize> {
        let mut indexes = self.indexes.write();
        let target = indexes
            .get_mut(index)
            .ok_or_else(|| Error::vector_db(format!("Index '{}' does not exist", index)))?;

        for record in records {
            if record.values.len() != target.spec.dimension {
                return Err(Error::vector_db(format!(
                    "Vector '{}' has dimension {}, index '{}' expects {}",
                    record.id,
                    record.values.len(),
                    index,
                    target.spec.dimension
                )));
            }
        }

        for record in records {
            target.records.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        let indexes = self.indexes.read();
        let target = indexes
            .get(index)
            .ok_or_else(|| Error::vector_db(format!("Index '{}' does not exist", index)))?;

        if vector.len() != target.spec.dimension {
            return Err(Error::vector_db(format!(
                "Query has dimension {}, index '{}' expects {}",
                vector.len(),
                index,
                target.spec.dimension
            )));
        }

        let mut matches: Vec<VectorMatch> = target
            .records
            .values()
            .map(|r| VectorMatch {
                id: r.id.clone(),
                score: score(target.spec.metric, vector, &r.values),
                metadata: r.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
