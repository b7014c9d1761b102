//! Core types for the chatbot

pub mod document;
pub mod response;
pub mod transcript;

pub use document::{Chunk, ChunkSource, Document, RetrievedChunk};
pub use response::{AskRequest, AskResponse, ErrorResponse, HealthResponse, UploadError, UploadResponse};
pub use transcript::{Exchange, Transcript};
