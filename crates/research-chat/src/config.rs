//! Configuration for the research chatbot

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable pointing at an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "RESEARCH_CHAT_CONFIG";

/// Upper bound for `openai.max_retries`
pub const MAX_RETRIES: u32 = 10;

/// Byte threshold carried over from cookie-backed session state
pub const COOKIE_SIZE_LIMIT: usize = 4093;

/// Main chatbot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// OpenAI embeddings + chat completions
    pub openai: OpenAiConfig,
    /// Hosted vector index configuration
    pub vector_db: VectorDbConfig,
    /// Web search configuration
    pub search: SearchConfig,
    /// Tracing service credentials
    pub telemetry: TelemetryConfig,
    /// Session and transcript policy
    pub session: SessionConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Upload handling
    pub ingestion: IngestionConfig,
    /// Answering loop configuration
    pub agent: AgentConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024,
        }
    }
}

/// OpenAI API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Chat model name
    pub chat_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests (0 = fail on first error)
    pub max_retries: u32,
    /// Texts per embeddings request
    pub embed_batch_size: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            embed_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: 0,
            embed_batch_size: 64,
        }
    }
}

/// Which vector index implementation backs the gateway
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Pinecone serverless index
    #[default]
    Pinecone,
    /// Process-local index (lost on restart)
    Memory,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Backend selection
    pub backend: VectorBackend,
    /// Pinecone API key
    pub api_key: Option<String>,
    /// Pinecone control plane URL
    pub control_plane_url: String,
    /// Pinecone API version header
    pub api_version: String,
    /// Index name
    pub index_name: String,
    /// Vector dimensionality (must match the embedding model)
    pub dimension: usize,
    /// Similarity metric
    pub metric: crate::providers::Metric,
    /// Serverless cloud
    pub cloud: String,
    /// Serverless region
    pub region: String,
    /// Vectors per upsert request
    pub upsert_batch_size: usize,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Pinecone,
            api_key: None,
            control_plane_url: "https://api.pinecone.io".to_string(),
            api_version: "2024-07".to_string(),
            index_name: "research-chatbot-index".to_string(),
            dimension: 1536,
            metric: crate::providers::Metric::Cosine,
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            upsert_batch_size: 100,
        }
    }
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// SerpAPI key; web search tool is disabled when absent
    pub serpapi_api_key: Option<String>,
    /// SerpAPI base URL
    pub base_url: String,
    /// Search engine parameter
    pub engine: String,
    /// Organic results returned to the agent
    pub num_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            serpapi_api_key: None,
            base_url: "https://serpapi.com".to_string(),
            engine: "google".to_string(),
            num_results: 5,
        }
    }
}

/// Tracing service credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Langtrace API key
    pub langtrace_api_key: Option<String>,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie carrying the session id
    pub cookie_name: String,
    /// Idle time before a session is evicted
    pub ttl_secs: u64,
    /// Interval of the background eviction sweep
    pub sweep_interval_secs: u64,
    /// Clear transcripts whose serialized size exceeds `size_limit_bytes`
    pub enforce_size_limit: bool,
    /// Transcript size threshold in bytes
    pub size_limit_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "chat_session".to_string(),
            ttl_secs: 24 * 60 * 60,
            sweep_interval_secs: 300,
            enforce_size_limit: false,
            size_limit_bytes: COOKIE_SIZE_LIMIT,
        }
    }
}

impl SessionConfig {
    /// Size bound in effect, if any
    pub fn size_limit(&self) -> Option<usize> {
        self.enforce_size_limit.then_some(self.size_limit_bytes)
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Separator used for the first split
    pub separator: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            separator: "\n\n".to_string(),
        }
    }
}

/// Upload handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Directory for scratch copies of uploads
    pub scratch_dir: PathBuf,
    /// Watchdog for pdf-extract in seconds
    pub pdf_timeout_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("data"),
            pdf_timeout_secs: 60,
        }
    }
}

/// How questions are answered
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// ReAct loop with retriever and web search tools
    #[default]
    Agent,
    /// Single retrieval followed by one grounded completion
    RetrievalChain,
}

/// Answering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Answer mode
    pub mode: AnswerMode,
    /// Upper bound on reasoning steps per question
    pub max_iterations: usize,
    /// Chunks returned by the retriever tool
    pub retriever_top_k: usize,
    /// Replaces the built-in agent instructions when set
    pub instructions: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            mode: AnswerMode::Agent,
            max_iterations: 8,
            retriever_top_k: 4,
            instructions: None,
        }
    }
}

impl ChatConfig {
    /// Load configuration: `.env` (development only), optional TOML file, then environment overrides
    pub fn load() -> Result<Self> {
        if std::env::var("ENVIRONMENT").as_deref() == Ok("development") {
            match dotenvy::dotenv() {
                Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
                Err(e) => tracing::debug!("No .env file loaded: {}", e),
            }
        }

        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("OPENAI_API_KEY") {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = non_empty("OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = non_empty("OPENAI_CHAT_MODEL") {
            self.openai.chat_model = v;
        }
        if let Some(v) = non_empty("PINECONE_API_KEY") {
            self.vector_db.api_key = Some(v);
        }
        if let Some(v) = non_empty("INDEX_NAME") {
            self.vector_db.index_name = v;
        }
        if let Some(v) = non_empty("VECTOR_BACKEND") {
            self.vector_db.backend = match v.to_lowercase().as_str() {
                "pinecone" => VectorBackend::Pinecone,
                "memory" => VectorBackend::Memory,
                other => {
                    return Err(Error::Config(format!("Unknown VECTOR_BACKEND: {}", other)))
                }
            };
        }
        if let Some(v) = non_empty("SERPAPI_API_KEY") {
            self.search.serpapi_api_key = Some(v);
        }
        if let Some(v) = non_empty("LANGTRACE_API_KEY") {
            self.telemetry.langtrace_api_key = Some(v);
        }
        if let Some(v) = non_empty("HOST") {
            self.server.host = v;
        }
        if let Some(v) = non_empty("PORT") {
            self.server.port = v
                .parse()
                .map_err(|e| Error::Config(format!("Invalid PORT '{}': {}", v, e)))?;
        }
        if let Some(v) = non_empty("SCRATCH_DIR") {
            self.ingestion.scratch_dir = PathBuf::from(v);
        }
        Ok(())
    }

    /// Reject configurations that cannot reach the selected backends
    pub fn validate(&self) -> Result<()> {
        if self.openai.api_key.is_none() {
            return Err(Error::Config("OPENAI_API_KEY is not set".to_string()));
        }
        if self.vector_db.backend == VectorBackend::Pinecone && self.vector_db.api_key.is_none() {
            return Err(Error::Config("PINECONE_API_KEY is not set".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.vector_db.dimension == 0 {
            return Err(Error::Config("vector_db.dimension must be positive".to_string()));
        }
        if self.agent.max_iterations == 0 {
            return Err(Error::Config("agent.max_iterations must be positive".to_string()));
        }
        if self.agent.retriever_top_k == 0 {
            return Err(Error::Config("agent.retriever_top_k must be positive".to_string()));
        }
        if self.search.num_results == 0 {
            return Err(Error::Config("search.num_results must be positive".to_string()));
        }
        if self.openai.max_retries > MAX_RETRIES {
            return Err(Error::Config(format!(
                "openai.max_retries ({}) must be at most {}",
                self.openai.max_retries, MAX_RETRIES
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_follow_chatbot_policy() {
        let config = ChatConfig::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.vector_db.index_name, "research-chatbot-index");
        assert_eq!(config.vector_db.dimension, 1536);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.session.size_limit(), None);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ChatConfig::default();
        config
            .apply_env(env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("PINECONE_API_KEY", "pc-test"),
                ("INDEX_NAME", "papers"),
                ("PORT", "9000"),
                ("SERPAPI_API_KEY", ""),
            ]))
            .unwrap();

        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.vector_db.index_name, "papers");
        assert_eq!(config.server.port, 9000);
        assert!(config.search.serpapi_api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut config = ChatConfig::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_requires_keys() {
        let config = ChatConfig::default();
        assert!(config.validate().is_err());

        let mut config = ChatConfig::default();
        config.openai.api_key = Some("sk".into());
        config.vector_db.backend = VectorBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_counts_and_retry_storms() {
        let valid = || {
            let mut config = ChatConfig::default();
            config.openai.api_key = Some("sk".into());
            config.vector_db.backend = VectorBackend::Memory;
            config
        };

        let mut config = valid();
        config.agent.retriever_top_k = 0;
        assert!(matches!(config.validate(), Err(Error::Config(ref m)) if m.contains("retriever_top_k")));

        let mut config = valid();
        config.search.num_results = 0;
        assert!(matches!(config.validate(), Err(Error::Config(ref m)) if m.contains("num_results")));

        let mut config = valid();
        config.openai.max_retries = 64;
        assert!(matches!(config.validate(), Err(Error::Config(ref m)) if m.contains("max_retries")));

        let mut config = valid();
        config.openai.max_retries = MAX_RETRIES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_size_limit_policy() {
        let mut session = SessionConfig::default();
        session.enforce_size_limit = true;
        assert_eq!(session.size_limit(), Some(COOKIE_SIZE_LIMIT));
    }

    #[test]
    fn test_toml_round_trip_of_partial_file() {
        let config: ChatConfig = toml::from_str(
            r#"
            [vector_db]
            backend = "memory"
            metric = "dotproduct"

            [agent]
            mode = "retrieval_chain"
            "#,
        )
        .unwrap();
        assert_eq!(config.vector_db.backend, VectorBackend::Memory);
        assert_eq!(config.vector_db.metric, crate::providers::Metric::DotProduct);
        assert_eq!(config.agent.mode, AnswerMode::RetrievalChain);
        assert_eq!(config.chunking.chunk_size, 1000);
    }
}
