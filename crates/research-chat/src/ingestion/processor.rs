//! Ingestion pipeline orchestration

use bytes::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::retrieval::VectorStoreGateway;
use crate::types::{Document, UploadError, UploadResponse};

use super::chunker::TextChunker;
use super::extractor::{DocumentExtractor, ExtractedDocument};
use super::validate::{sanitize_filename, validate_upload};

/// Outcome of a bulk upload
pub type BulkIngestReport = UploadResponse;

/// One file received from a client
#[derive(Debug, Clone)]
pub struct Upload {
    /// Name as sent by the client
    pub filename: Option<String>,
    pub data: Bytes,
}

impl Upload {
    pub fn new(filename: Option<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename,
            data: data.into(),
        }
    }
}

/// Main ingestion pipeline: scratch copy, extract, chunk, embed + upsert
pub struct IngestPipeline {
    gateway: Arc<VectorStoreGateway>,
    extractor: Arc<dyn DocumentExtractor>,
    chunker: TextChunker,
    scratch_dir: PathBuf,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(
        gateway: Arc<VectorStoreGateway>,
        extractor: Arc<dyn DocumentExtractor>,
        chunker: TextChunker,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            gateway,
            extractor,
            chunker,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Ingest one upload
    ///
    /// The bytes are written to a scratch file that is removed when this
    /// returns, whether ingestion succeeded or not.
    pub async fn ingest(&self, filename: &str, data: &[u8]) -> Result<Document> {
        let filename = sanitize_filename(filename);
        let scratch_dir = self.scratch_dir.clone();
        let extractor = self.extractor.clone();
        let bytes = data.to_vec();
        let name = filename.clone();

        // Scratch guard lives until the end of this function
        let (_scratch, extracted) = tokio::task::spawn_blocking(move || {
            let scratch = write_scratch(&scratch_dir, &name, &bytes)?;
            tracing::info!("File saved: {}", scratch.path().display());
            let extracted = extractor.extract(&name, scratch.path());
            Ok::<_, Error>((scratch, extracted))
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        let extracted = extracted?;
        self.store(filename, data.len() as u64, extracted).await
    }

    /// Ingest a PDF already on disk; the file is left in place
    pub async fn ingest_path(&self, path: &Path) -> Result<Document> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::validation("File has no name."))?;
        let file_size = tokio::fs::metadata(path).await?.len();

        let extractor = self.extractor.clone();
        let owned = path.to_path_buf();
        let name = filename.clone();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&name, &owned))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        self.store(filename, file_size, extracted).await
    }

    async fn store(
        &self,
        filename: String,
        file_size: u64,
        extracted: ExtractedDocument,
    ) -> Result<Document> {
        tracing::info!(
            "Loaded {} page(s) ({} chars) from {}",
            extracted.pages.len(),
            extracted.char_count(),
            filename
        );

        let mut doc = Document::new(filename, extracted.content_hash.clone(), file_size);
        doc.total_pages = extracted.page_count;

        let chunks = self.chunker.chunk_document(&doc, &extracted);
        doc.total_chunks = chunks.len() as u32;
        tracing::info!("Created {} chunks", chunks.len());

        let written = self.gateway.add(&chunks).await?;
        tracing::info!(
            "File successfully processed and added to database: {} ({} vectors)",
            doc.filename,
            written
        );
        Ok(doc)
    }

    /// Ingest every upload, collecting per-file failures instead of stopping
    pub async fn ingest_many(&self, uploads: Vec<Upload>) -> BulkIngestReport {
        let mut report = BulkIngestReport::default();

        for upload in uploads {
            let filename = match validate_upload(upload.filename.as_deref()) {
                Ok(name) => name,
                Err(e) => {
                    tracing::error!("{}", e);
                    report.errors.push(UploadError {
                        file: upload.filename.filter(|n| !n.is_empty()),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            match self.ingest(&filename, &upload.data).await {
                Ok(doc) => report.processed_files.push(doc.filename),
                Err(e) => {
                    let safe = sanitize_filename(&filename);
                    let error = format!("Error processing file '{}': {}", safe, e);
                    tracing::error!("{}", error);
                    report.errors.push(UploadError {
                        file: Some(safe),
                        error,
                    });
                }
            }
        }

        if report.is_partial() {
            tracing::warn!(
                "Bulk upload completed with {} error(s), {} file(s) processed",
                report.errors.len(),
                report.processed_files.len()
            );
        }

        report
    }
}

fn write_scratch(dir: &Path, filename: &str, data: &[u8]) -> Result<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let mut scratch = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!("-{}", filename))
        .tempfile_in(dir)?;
    scratch.write_all(data)?;
    scratch.flush()?;
    Ok(scratch)
}
