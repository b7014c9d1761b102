//! Document ingestion pipeline: validate, extract, chunk, index

mod chunker;
pub mod extractor;
mod processor;
mod validate;

pub use chunker::TextChunker;
pub use extractor::{DocumentExtractor, ExtractedDocument, PageText, PdfExtractor, PlainTextExtractor};
pub use processor::{BulkIngestReport, IngestPipeline, Upload};
pub use validate::{sanitize_filename, validate_upload};
