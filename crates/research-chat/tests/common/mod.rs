//! Shared fixtures for the HTTP tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tempfile::TempDir;

use research_chat::config::{AnswerMode, ChatConfig, VectorBackend};
use research_chat::error::{Error, Result};
use research_chat::ingestion::PlainTextExtractor;
use research_chat::providers::{
    ChatMessage, ChatModel, EmbeddingProvider, InMemoryIndex, ProviderSet,
};
use research_chat::AppState;

pub const DIMS: usize = 8;
pub const BOUNDARY: &str = "X-RESEARCH-CHAT-BOUNDARY";

/// Letter-frequency embedding, good enough to rank keyword overlap
pub struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0; DIMS];
        for b in text.to_lowercase().bytes().filter(u8::is_ascii_alphabetic) {
            v[(b - b'a') as usize % DIMS] += 1.0;
        }
        v[0] += 0.01;
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn name(&self) -> &str {
        "letters"
    }
}

/// Replays canned completions, then repeats the last one
pub struct CannedChat {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
}

impl CannedChat {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            last: Mutex::new(None),
        })
    }
}

#[async_trait]
impl ChatModel for CannedChat {
    async fn complete(&self, _messages: &[ChatMessage], _stop: &[String]) -> Result<String> {
        let next = self.replies.lock().pop_front();
        let mut last = self.last.lock();
        if let Some(reply) = next {
            *last = Some(reply);
        }
        last.clone().ok_or_else(|| Error::llm("no canned reply"))
    }

    fn name(&self) -> &str {
        "canned"
    }

    fn model(&self) -> &str {
        "canned"
    }
}

pub struct TestApp {
    pub state: AppState,
    pub scratch: TempDir,
}

/// App over an in-memory index whose "PDFs" are plain UTF-8 text
pub async fn app(replies: &[&str]) -> TestApp {
    let scratch = tempfile::tempdir().expect("scratch dir");

    let mut config = ChatConfig::default();
    config.vector_db.backend = VectorBackend::Memory;
    config.vector_db.dimension = DIMS;
    config.vector_db.index_name = "http-test-index".to_string();
    config.ingestion.scratch_dir = scratch.path().to_path_buf();
    config.agent.mode = AnswerMode::Agent;

    let providers = ProviderSet {
        vector_store: Arc::new(InMemoryIndex::new()),
        embedder: Arc::new(LetterEmbedder),
        chat: CannedChat::new(replies),
        search: None,
    };

    let state = AppState::from_providers(config, providers, Arc::new(PlainTextExtractor))
        .await
        .expect("app state");

    TestApp { state, scratch }
}

/// Multipart body with one part per `(field, filename, content)`
pub fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> Vec<u8> {
    let mut body = String::new();
    for (field, filename, content) in parts {
        body.push_str(&format!("--{}\r\n", BOUNDARY));
        match filename {
            Some(name) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, name
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n",
                field
            )),
        }
        body.push_str("Content-Type: application/octet-stream\r\n\r\n");
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body.into_bytes()
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
