//! Text extraction from uploaded files

use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Page separator in plain-text sources
const FORM_FEED: char = '\u{c}';

/// Text of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-indexed page number
    pub number: u32,
    pub text: String,
}

/// Result of extracting a document
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Non-empty pages in document order
    pub pages: Vec<PageText>,
    /// Page count of the source, when known
    pub page_count: Option<u32>,
    /// SHA-256 of the extracted text
    pub content_hash: String,
}

impl ExtractedDocument {
    /// Build from raw page texts, dropping pages with no text
    ///
    /// Errors when nothing extractable is left.
    pub fn from_pages(filename: &str, pages: Vec<String>, page_count: Option<u32>) -> Result<Self> {
        let pages: Vec<PageText> = pages
            .into_iter()
            .enumerate()
            .map(|(i, raw)| PageText {
                number: i as u32 + 1,
                text: clean_text(&raw),
            })
            .filter(|p| !p.text.trim().is_empty())
            .collect();

        if pages.is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted",
            ));
        }

        let mut hasher = Sha256::new();
        for page in &pages {
            hasher.update(page.text.as_bytes());
        }

        Ok(Self {
            pages,
            page_count,
            content_hash: hex::encode(hasher.finalize()),
        })
    }

    /// Total extracted characters
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// Normalize whitespace while keeping paragraph breaks
fn clean_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0;

    for line in raw.replace('\0', "").lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        blank_run = 0;
    }

    out
}

/// Turns a file on disk into page texts
///
/// Called from a blocking task.
pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, filename: &str, path: &Path) -> Result<ExtractedDocument>;
}

/// PDF extraction via pdf-extract with a lopdf fallback
pub struct PdfExtractor {
    timeout: Duration,
}

impl PdfExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run pdf-extract on a watchdog thread so pathological fonts cannot hang ingestion
    fn extract_with_timeout(&self, data: Vec<u8>) -> std::result::Result<Vec<String>, String> {
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem_by_pages(&data);
            let _ = tx.send(result.map_err(|e| e.to_string()));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(result) => {
                let _ = handle.join();
                result
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // the thread cannot be killed; it is left to finish on its own
                Err(format!("timed out after {:?}", self.timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err("extraction thread crashed".to_string())
            }
        }
    }

    /// Per-page extraction straight from lopdf
    fn extract_fallback(filename: &str, doc: &lopdf::Document) -> Result<Vec<String>> {
        let pages = doc.get_pages();
        let mut texts = Vec::with_capacity(pages.len());

        for page_number in pages.keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(text) => texts.push(text),
                Err(e) => {
                    tracing::debug!("{}: no text on page {}: {}", filename, page_number, e);
                    texts.push(String::new());
                }
            }
        }

        if texts.iter().all(|t| t.trim().is_empty()) {
            tracing::warn!("{}: fallback extraction produced no text", filename);
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(texts)
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl DocumentExtractor for PdfExtractor {
    fn extract(&self, filename: &str, path: &Path) -> Result<ExtractedDocument> {
        let data = std::fs::read(path)?;

        let parsed = lopdf::Document::load_mem(&data).ok();
        let page_count = parsed.as_ref().map(|d| d.get_pages().len() as u32);

        let pages = match self.extract_with_timeout(data) {
            Ok(pages) if pages.iter().any(|p| !p.trim().is_empty()) => pages,
            Ok(_) => {
                tracing::warn!("{}: pdf-extract returned no text, trying fallback", filename);
                let doc = parsed
                    .as_ref()
                    .ok_or_else(|| Error::file_parse(filename, "Failed to load PDF"))?;
                Self::extract_fallback(filename, doc)?
            }
            Err(e) => {
                tracing::warn!("{}: pdf-extract failed ({}), trying fallback", filename, e);
                let doc = parsed
                    .as_ref()
                    .ok_or_else(|| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;
                Self::extract_fallback(filename, doc)?
            }
        };

        let page_count = page_count.or(Some(pages.len() as u32));
        ExtractedDocument::from_pages(filename, pages, page_count)
    }
}

/// UTF-8 files with form feeds between pages
///
/// Used by the offline tooling and tests where real PDFs are not at hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl DocumentExtractor for PlainTextExtractor {
    fn extract(&self, filename: &str, path: &Path) -> Result<ExtractedDocument> {
        let raw = std::fs::read(path)?;
        let text = String::from_utf8(raw)
            .map_err(|_| Error::file_parse(filename, "File is not valid UTF-8"))?;
        let pages: Vec<String> = text.split(FORM_FEED).map(str::to_string).collect();
        let count = pages.len() as u32;
        ExtractedDocument::from_pages(filename, pages, Some(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_clean_text_keeps_paragraphs() {
        let cleaned = clean_text("Title  \n\n\n\nFirst line\nsecond\0 line\n   \nLast");
        assert_eq!(cleaned, "Title\n\nFirst line\nsecond line\n\nLast");
    }

    #[test]
    fn test_from_pages_numbers_and_skips_blank() {
        let doc = ExtractedDocument::from_pages(
            "a.pdf",
            vec!["one".into(), "   ".into(), "three".into()],
            Some(3),
        )
        .unwrap();
        let numbers: Vec<u32> = doc.pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(doc.content_hash.len(), 64);
        assert_eq!(doc.char_count(), 8);
    }

    #[test]
    fn test_empty_extraction_is_error() {
        let err = ExtractedDocument::from_pages("blank.pdf", vec![String::new()], Some(1))
            .unwrap_err();
        assert!(matches!(err, Error::FileParse { ref filename, .. } if filename == "blank.pdf"));
    }

    #[test]
    fn test_plain_text_extractor_splits_pages() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "page one\u{c}page two").unwrap();

        let doc = PlainTextExtractor.extract("notes.pdf", file.path()).unwrap();
        assert_eq!(doc.page_count, Some(2));
        assert_eq!(doc.pages[1].text, "page two");
    }

    /// Minimal PDF with one line of Courier text per page
    fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream};

        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_extractor_keeps_page_numbers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&pdf_with_pages(&["Alpha page one text", "Bravo page two text"]))
            .unwrap();

        let doc = PdfExtractor::new(Duration::from_secs(30))
            .extract("two-pages.pdf", file.path())
            .unwrap();

        assert_eq!(doc.page_count, Some(2));
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].number, 1);
        assert!(doc.pages[0].text.contains("Alpha"));
        assert!(!doc.pages[0].text.contains("Bravo"));
        assert_eq!(doc.pages[1].number, 2);
        assert!(doc.pages[1].text.contains("Bravo"));
    }

    #[test]
    fn test_pdf_extractor_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a pdf").unwrap();

        let result = PdfExtractor::new(Duration::from_secs(5)).extract("junk.pdf", file.path());
        assert!(result.is_err());
    }
}
