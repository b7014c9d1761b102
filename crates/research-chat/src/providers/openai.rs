//! OpenAI client for embeddings and chat completions
//!
//! One HTTP client is shared by the embedding and chat providers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::OpenAiConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::{ChatMessage, ChatModel};

/// OpenAI API client with optional retry
pub struct OpenAiClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: OpenAiConfig,
    /// API key sent as bearer token
    api_key: String,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "no_stop")]
    stop: &'a [String],
}

fn no_stop(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Longest wait between retries
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// 1s, 2s, 4s, ... capped at `MAX_BACKOFF`
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt)).min(MAX_BACKOFF)
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        let delay = backoff_delay(attempt);
                        tracing::warn!(
                            "OpenAI request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.config.max_retries.saturating_add(1),
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Llm("Unknown error".to_string())))
    }

    /// Embed a batch of texts, preserving input order
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.url("embeddings");
        let url = url.as_str();
        let client = &self.client;
        let api_key = self.api_key.as_str();
        let model = self.config.embed_model.as_str();

        self.retry_request(|| async move {
            let response = client
                .post(url)
                .bearer_auth(api_key)
                .json(&EmbeddingsRequest {
                    model,
                    input: texts,
                })
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::embedding(format!("HTTP {} - {}", status, body)));
            }

            let mut parsed: EmbeddingsResponse = response
                .json()
                .await
                .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

            if parsed.data.len() != texts.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    texts.len(),
                    parsed.data.len()
                )));
            }

            parsed.data.sort_by_key(|d| d.index);
            Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
        })
        .await
    }

    /// Run a chat completion and return the first choice's text
    pub async fn chat(&self, messages: &[ChatMessage], stop: &[String]) -> Result<String> {
        let url = self.url("chat/completions");

        tracing::debug!(
            "Chat completion with model {} ({} messages)",
            self.config.chat_model,
            messages.len()
        );

        let url = url.as_str();
        let client = &self.client;
        let api_key = self.api_key.as_str();
        let model = self.config.chat_model.as_str();
        let temperature = self.config.temperature;

        self.retry_request(|| async move {
            let response = client
                .post(url)
                .bearer_auth(api_key)
                .json(&ChatRequest {
                    model,
                    messages,
                    temperature,
                    stop,
                })
                .send()
                .await
                .map_err(|e| Error::llm(format!("Chat request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::llm(format!("HTTP {} - {}", status, body)));
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| Error::llm(format!("Failed to parse chat response: {}", e)))?;

            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| Error::llm("Chat response contained no content"))
        })
        .await
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }
}

/// OpenAI embedding provider
pub struct OpenAiEmbedder {
    client: Arc<OpenAiClient>,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Create from existing OpenAiClient
    pub fn from_client(client: Arc<OpenAiClient>, dimensions: usize) -> Self {
        Self { client, dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.client.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::embedding("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// OpenAI chat provider
pub struct OpenAiChat {
    client: Arc<OpenAiClient>,
    model: String,
}

impl OpenAiChat {
    /// Create from existing OpenAiClient
    pub fn from_client(client: Arc<OpenAiClient>) -> Self {
        let model = client.config().chat_model.clone();
        Self { client, model }
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage], stop: &[String]) -> Result<String> {
        self.client.chat(messages, stop).await
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
        assert_eq!(backoff_delay(6), MAX_BACKOFF);
        assert_eq!(backoff_delay(64), MAX_BACKOFF);
        assert_eq!(backoff_delay(u32::MAX), MAX_BACKOFF);
    }

    fn config(base_url: String) -> OpenAiConfig {
        OpenAiConfig {
            api_key: Some("sk-test".to_string()),
            base_url,
            ..OpenAiConfig::default()
        }
    }

    #[tokio::test]
    async fn test_embed_batch_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "text-embedding-3-small"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [0.0, 1.0], "index": 1},
                    {"embedding": [1.0, 0.0], "index": 0}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(server.uri())).unwrap();
        let out = client
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_chat_sends_stop_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "stop": ["\nObservation:"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Final Answer: 42"}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(server.uri())).unwrap();
        let text = client
            .chat(&[ChatMessage::user("hi")], &["\nObservation:".to_string()])
            .await
            .unwrap();
        assert_eq!(text, "Final Answer: 42");
    }

    #[tokio::test]
    async fn test_http_error_is_not_retried_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(server.uri())).unwrap();
        let err = client.chat(&[ChatMessage::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = OpenAiClient::new(&OpenAiConfig::default()).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
