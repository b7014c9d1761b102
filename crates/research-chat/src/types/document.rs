//! Document and chunk types with source tracking

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Metadata key holding the chunk text inside the vector index
pub const TEXT_KEY: &str = "text";

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document ID, derived from the content hash when there is one
    pub id: Uuid,
    /// Sanitized filename as uploaded
    pub filename: String,
    /// SHA-256 of the extracted text
    pub content_hash: String,
    /// Total number of pages
    pub total_pages: Option<u32>,
    /// Total number of chunks created
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    ///
    /// Identical text yields the same id, so re-uploading a document
    /// overwrites its vectors instead of duplicating them.
    pub fn new(filename: String, content_hash: String, file_size: u64) -> Self {
        let id = content_hash
            .get(..32)
            .and_then(|prefix| Uuid::parse_str(prefix).ok())
            .unwrap_or_else(Uuid::new_v4);
        Self {
            id,
            filename,
            content_hash,
            total_pages: None,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Source information for a chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkSource {
    /// Filename the chunk came from
    pub filename: String,
    /// Page number (1-indexed)
    pub page_number: Option<u32>,
    /// Total pages in document
    pub page_count: Option<u32>,
}

impl ChunkSource {
    /// Create source info for a PDF page
    pub fn pdf(filename: String, page: u32, total_pages: Option<u32>) -> Self {
        Self {
            filename,
            page_number: Some(page),
            page_count: total_pages,
        }
    }

    /// Format source for display
    pub fn format_citation(&self) -> String {
        match self.page_number {
            Some(page) => format!("{}, Page {}", self.filename, page),
            None => self.filename.clone(),
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Source information
    pub source: ChunkSource,
    /// Chunk index within document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(document_id: Uuid, content: String, source: ChunkSource, chunk_index: u32) -> Self {
        Self {
            document_id,
            content,
            source,
            chunk_index,
        }
    }

    /// Stable id of this chunk inside the vector index
    pub fn vector_id(&self) -> String {
        format!("{}#{}", self.document_id, self.chunk_index)
    }

    /// Convert to vector metadata for storage
    pub fn to_vector_metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert(TEXT_KEY.to_string(), json!(self.content));
        meta.insert("source".to_string(), json!(self.source.filename));
        meta.insert("document_id".to_string(), json!(self.document_id.to_string()));
        meta.insert("chunk_index".to_string(), json!(self.chunk_index));

        if let Some(page) = self.source.page_number {
            meta.insert("page".to_string(), json!(page));
        }
        if let Some(count) = self.source.page_count {
            meta.insert("page_count".to_string(), json!(count));
        }

        meta
    }
}

/// A chunk returned by a similarity query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Vector id
    pub id: String,
    /// Text content
    pub content: String,
    /// Source information
    pub source: ChunkSource,
    /// Similarity score, higher is closer
    pub score: f32,
}

impl RetrievedChunk {
    /// Rebuild a chunk from index metadata
    pub fn from_metadata(id: String, score: f32, metadata: &Map<String, Value>) -> Self {
        let content = metadata
            .get(TEXT_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let filename = metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let page_number = metadata
            .get("page")
            .and_then(Value::as_u64)
            .map(|p| p as u32);
        let page_count = metadata
            .get("page_count")
            .and_then(Value::as_u64)
            .map(|p| p as u32);

        Self {
            id,
            content,
            source: ChunkSource {
                filename,
                page_number,
                page_count,
            },
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_restores_chunk() {
        let doc_id = Uuid::new_v4();
        let chunk = Chunk::new(
            doc_id,
            "Attention is all you need.".to_string(),
            ChunkSource::pdf("paper.pdf".to_string(), 3, Some(12)),
            7,
        );

        let restored = RetrievedChunk::from_metadata(chunk.vector_id(), 0.9, &chunk.to_vector_metadata());
        assert_eq!(restored.id, format!("{}#7", doc_id));
        assert_eq!(restored.content, chunk.content);
        assert_eq!(restored.source, chunk.source);
        assert_eq!(restored.source.format_citation(), "paper.pdf, Page 3");
    }

    #[test]
    fn test_document_id_follows_content_hash() {
        let hash = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
        let first = Document::new("a.pdf".to_string(), hash.to_string(), 10);
        let again = Document::new("a-copy.pdf".to_string(), hash.to_string(), 10);
        assert_eq!(first.id, again.id);
        assert_eq!(first.id.simple().to_string(), hash[..32]);

        let other = Document::new("b.pdf".to_string(), "0".repeat(64), 10);
        assert_ne!(first.id, other.id);
    }

    #[test]
    fn test_document_without_hash_gets_random_id() {
        let a = Document::new("a.pdf".to_string(), String::new(), 1);
        let b = Document::new("a.pdf".to_string(), String::new(), 1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_missing_metadata_falls_back() {
        let restored = RetrievedChunk::from_metadata("x".into(), 0.1, &Map::new());
        assert!(restored.content.is_empty());
        assert_eq!(restored.source.filename, "unknown");
        assert_eq!(restored.source.format_citation(), "unknown");
    }
}
