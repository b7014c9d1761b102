//! Separator-based text chunking with overlap and page tracking

use std::collections::VecDeque;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, ChunkSource, Document};

use super::extractor::ExtractedDocument;

/// Text chunker with configurable size and overlap
///
/// Text is split on `separator`, then neighbouring pieces are merged back
/// together until adding another would pass `chunk_size`. Each new chunk
/// starts with trailing pieces of the previous one, up to `chunk_overlap`.
/// Sizes are measured in characters.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    chunk_overlap: usize,
    /// Split point
    separator: String,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
            separator: "\n\n".to_string(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap).with_separator(config.separator.clone())
    }

    /// Chunk every page of an extracted document
    ///
    /// Chunks never span pages; `chunk_index` runs across the whole document.
    pub fn chunk_document(&self, doc: &Document, extracted: &ExtractedDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in &extracted.pages {
            for text in self.split_text(&page.text) {
                let source =
                    ChunkSource::pdf(doc.filename.clone(), page.number, extracted.page_count);
                let index = chunks.len() as u32;
                chunks.push(Chunk::new(doc.id, text, source, index));
            }
        }

        chunks
    }

    /// Split text into overlapping chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = if self.separator.is_empty() {
            vec![text]
        } else {
            text.split(self.separator.as_str()).collect()
        };

        let mut splits = Vec::new();
        for piece in pieces.into_iter().filter(|p| !p.is_empty()) {
            if char_len(piece) > self.chunk_size {
                tracing::debug!(
                    "Splitting oversized piece of {} chars into windows",
                    char_len(piece)
                );
                splits.extend(self.windows(piece));
            } else {
                splits.push(piece.to_string());
            }
        }

        self.merge_splits(splits)
    }

    /// Fixed windows over a piece with no separator inside it
    fn windows(&self, piece: &str) -> Vec<String> {
        let chars: Vec<char> = piece.chars().collect();
        let step = self.chunk_size - self.chunk_overlap;
        let mut out = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            out.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }

        out
    }

    fn merge_splits(&self, splits: Vec<String>) -> Vec<String> {
        let sep_len = char_len(&self.separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<String> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = char_len(&split);
            let joined_len = |total: usize, current: &VecDeque<String>| {
                total + len + if current.is_empty() { 0 } else { sep_len }
            };

            if joined_len(total, &current) > self.chunk_size && !current.is_empty() {
                if let Some(doc) = self.join(&current) {
                    docs.push(doc);
                }

                // Keep a tail of the previous chunk as overlap
                while total > self.chunk_overlap
                    || (joined_len(total, &current) > self.chunk_size && total > 0)
                {
                    let Some(first) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(&first) + if current.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + if current.is_empty() { 0 } else { sep_len };
            current.push_back(split);
        }

        if let Some(doc) = self.join(&current) {
            docs.push(doc);
        }

        docs
    }

    fn join(&self, parts: &VecDeque<String>) -> Option<String> {
        let joined = parts
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&self.separator);
        let trimmed = joined.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(1000, 100)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
