//! Application state for the chat server

use std::sync::Arc;
use std::time::Duration;

use crate::agent::{AnsweringOrchestrator, ToolRuntime};
use crate::config::ChatConfig;
use crate::error::Result;
use crate::ingestion::{DocumentExtractor, IngestPipeline, PdfExtractor, TextChunker};
use crate::providers::{IndexSpec, ProviderSet};
use crate::retrieval::VectorStoreGateway;
use crate::session::SessionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: ChatConfig,
    /// Embeds and indexes chunks, serves retrieval
    gateway: Arc<VectorStoreGateway>,
    /// Upload processing
    pipeline: IngestPipeline,
    /// Session id -> transcript
    sessions: Arc<SessionStore>,
    /// Question answering
    orchestrator: AnsweringOrchestrator,
}

impl AppState {
    /// Create state backed by the providers named in `config`
    pub async fn new(config: ChatConfig) -> Result<Self> {
        tracing::info!(
            "Initializing chat application state (vector backend: {:?})...",
            config.vector_db.backend
        );
        let providers = ProviderSet::from_config(&config)?;
        let extractor = Arc::new(PdfExtractor::new(Duration::from_secs(
            config.ingestion.pdf_timeout_secs,
        )));
        Self::from_providers(config, providers, extractor).await
    }

    /// Create state from explicit providers
    ///
    /// The vector index is ensured before this returns.
    pub async fn from_providers(
        config: ChatConfig,
        providers: ProviderSet,
        extractor: Arc<dyn DocumentExtractor>,
    ) -> Result<Self> {
        let spec = IndexSpec::new(
            config.vector_db.index_name.clone(),
            config.vector_db.dimension,
            config.vector_db.metric,
        );
        let gateway = Arc::new(
            VectorStoreGateway::new(providers.vector_store, providers.embedder, spec.clone())
                .with_embed_batch_size(config.openai.embed_batch_size),
        );
        gateway.ensure_index(&spec).await?;
        tracing::info!("Vector index ready: {}", spec.name);

        let pipeline = IngestPipeline::new(
            gateway.clone(),
            extractor,
            TextChunker::from_config(&config.chunking),
            config.ingestion.scratch_dir.clone(),
        );

        let sessions = Arc::new(SessionStore::from_config(&config.session));
        if let Some(limit) = config.session.size_limit() {
            tracing::info!("Transcript size limit enabled: {} bytes", limit);
        }

        let runtime = Arc::new(ToolRuntime::new(
            gateway.clone(),
            providers.search,
            config.agent.retriever_top_k,
            config.search.num_results,
        ));
        let orchestrator = AnsweringOrchestrator::from_config(
            &config.agent,
            providers.chat,
            runtime,
            sessions.clone(),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                gateway,
                pipeline,
                sessions,
                orchestrator,
            }),
        })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.inner.config
    }

    pub fn gateway(&self) -> &Arc<VectorStoreGateway> {
        &self.inner.gateway
    }

    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.inner.sessions
    }

    pub fn orchestrator(&self) -> &AnsweringOrchestrator {
        &self.inner.orchestrator
    }
}
