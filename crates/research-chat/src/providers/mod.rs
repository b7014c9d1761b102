//! Provider abstractions for embeddings, chat, vector storage, and web search
//!
//! Each external service sits behind a trait so the pipeline and the agent can
//! run against OpenAI/Pinecone/SerpAPI in production and fakes in tests.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod openai;
pub mod pinecone;
pub mod search;
pub mod serpapi;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::{ChatMessage, ChatModel, ChatRole};
pub use memory::InMemoryIndex;
pub use openai::{OpenAiChat, OpenAiClient, OpenAiEmbedder};
pub use pinecone::PineconeIndex;
pub use search::{SearchHit, WebSearchProvider};
pub use serpapi::SerpApiClient;
pub use vector_store::{IndexSpec, Metric, VectorMatch, VectorRecord, VectorStoreProvider};

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ChatConfig, VectorBackend};
use crate::error::Result;

/// The concrete backends selected by configuration
#[derive(Clone)]
pub struct ProviderSet {
    pub vector_store: Arc<dyn VectorStoreProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub chat: Arc<dyn ChatModel>,
    /// Absent when no SerpAPI key is configured
    pub search: Option<Arc<dyn WebSearchProvider>>,
}

impl ProviderSet {
    /// Build providers from configuration
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.openai.timeout_secs);

        let openai = Arc::new(OpenAiClient::new(&config.openai)?);
        tracing::info!(
            "OpenAI client initialized (embed: {}, chat: {})",
            config.openai.embed_model,
            config.openai.chat_model
        );

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbedder::from_client(
            openai.clone(),
            config.vector_db.dimension,
        ));
        let chat: Arc<dyn ChatModel> = Arc::new(OpenAiChat::from_client(openai));

        let vector_store: Arc<dyn VectorStoreProvider> = match config.vector_db.backend {
            VectorBackend::Pinecone => {
                tracing::info!("Using Pinecone index '{}'", config.vector_db.index_name);
                Arc::new(PineconeIndex::new(&config.vector_db, timeout)?)
            }
            VectorBackend::Memory => {
                tracing::warn!("Using in-memory vector index; uploads are lost on restart");
                Arc::new(InMemoryIndex::new())
            }
        };

        let search: Option<Arc<dyn WebSearchProvider>> = match config.search.serpapi_api_key {
            Some(_) => {
                tracing::info!("Web search tool enabled (SerpAPI)");
                Some(Arc::new(SerpApiClient::new(&config.search, timeout)?))
            }
            None => {
                tracing::info!("SERPAPI_API_KEY not set; web search tool disabled");
                None
            }
        };

        Ok(Self {
            vector_store,
            embedder,
            chat,
            search,
        })
    }
}
