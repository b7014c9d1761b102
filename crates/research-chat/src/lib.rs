//! research-chat: a document research chatbot
//!
//! Uploaded PDFs are split into overlapping chunks, embedded, and stored in a
//! hosted vector index. Questions are answered by a ReAct agent that can
//! consult the index (and optionally the web), with a per-session transcript
//! carried between turns.

pub mod agent;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod types;

pub use config::ChatConfig;
pub use error::{Error, Result};
pub use server::{state::AppState, ChatServer};
pub use types::{
    document::{Chunk, ChunkSource, Document, RetrievedChunk},
    response::{AskRequest, AskResponse, UploadResponse},
    transcript::{Exchange, Transcript},
};
