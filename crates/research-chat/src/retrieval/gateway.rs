//! Vector store gateway: ensure-index, add, and query over a named index

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, IndexSpec, VectorRecord, VectorStoreProvider};
use crate::types::{Chunk, RetrievedChunk};

/// Proof that an index exists with the expected shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    spec: IndexSpec,
}

impl IndexHandle {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// Embeds text and talks to the configured vector index
pub struct VectorStoreGateway {
    store: Arc<dyn VectorStoreProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    spec: IndexSpec,
    embed_batch_size: usize,
    /// Indexes confirmed during this process
    ensured: Mutex<HashMap<String, IndexHandle>>,
}

impl VectorStoreGateway {
    pub fn new(
        store: Arc<dyn VectorStoreProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        spec: IndexSpec,
    ) -> Self {
        Self {
            store,
            embedder,
            spec,
            embed_batch_size: 64,
            ensured: Mutex::new(HashMap::new()),
        }
    }

    /// Texts sent per embeddings request
    pub fn with_embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch_size = size.max(1);
        self
    }

    /// Make sure `spec` exists, creating it at most once per process
    ///
    /// An existing index with a different dimension or metric is an error.
    pub async fn ensure_index(&self, spec: &IndexSpec) -> Result<IndexHandle> {
        let mut ensured = self.ensured.lock().await;
        if let Some(handle) = ensured.get(&spec.name) {
            if handle.spec.is_compatible(spec) {
                return Ok(handle.clone());
            }
            return Err(mismatch(&handle.spec, spec));
        }

        let existing = self.store.list_indexes().await?;
        match existing.into_iter().find(|i| i.name == spec.name) {
            Some(found) if !found.is_compatible(spec) => return Err(mismatch(&found, spec)),
            Some(_) => {
                tracing::info!("Index {} already exists.", spec.name);
            }
            None => {
                tracing::info!(
                    "Creating index {} ({} dims, {})",
                    spec.name,
                    spec.dimension,
                    spec.metric
                );
                self.store.create_index(spec).await?;
            }
        }

        let handle = IndexHandle { spec: spec.clone() };
        ensured.insert(spec.name.clone(), handle.clone());
        Ok(handle)
    }

    /// Embed and upsert chunks, returning how many vectors were written
    pub async fn add(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let handle = self.ensure_index(&self.spec).await?;
        let mut written = 0;

        for batch in chunks.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let records = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, values)| {
                    self.check_dimension(&values)?;
                    Ok(VectorRecord {
                        id: chunk.vector_id(),
                        values,
                        metadata: chunk.to_vector_metadata(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            written += self.store.upsert(handle.name(), &records).await?;
        }

        tracing::debug!("Upserted {} vectors into {}", written, handle.name());
        Ok(written)
    }

    /// Top-k chunks most similar to `text`, best first
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let handle = self.ensure_index(&self.spec).await?;
        let embedding = self.embedder.embed(text).await?;
        self.check_dimension(&embedding)?;

        let matches = self.store.query(handle.name(), &embedding, k).await?;
        let mut chunks: Vec<RetrievedChunk> = matches
            .into_iter()
            .map(|m| RetrievedChunk::from_metadata(m.id, m.score, &m.metadata))
            .collect();

        chunks.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        chunks.truncate(k);
        Ok(chunks)
    }

    fn check_dimension(&self, values: &[f32]) -> Result<()> {
        if values.len() != self.spec.dimension {
            return Err(Error::embedding(format!(
                "Embedding has {} dimensions, index '{}' expects {}",
                values.len(),
                self.spec.name,
                self.spec.dimension
            )));
        }
        Ok(())
    }
}

fn mismatch(existing: &IndexSpec, wanted: &IndexSpec) -> Error {
    Error::vector_db(format!(
        "Index '{}' exists with {} dims/{}, expected {} dims/{}",
        existing.name, existing.dimension, existing.metric, wanted.dimension, wanted.metric
    ))
}
