// Résumé document pipeline: upload → pre-validation → extraction → page-limit check.
// Extraction is blocking work and always runs off the async executor.

pub mod backend;
pub mod extractor;
pub mod handlers;
pub mod validation;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use backend::{InMemoryBackend, PdfBackend, PdftotextBackend};
pub use extractor::{DocumentExtractor, ExtractOptions};
pub use validation::{process_upload, MAX_PAGES};

/// Separator placed between page contents in `ExtractedDocument::content`.
pub const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("No file provided")]
    MissingFile,

    #[error("File must be a PDF")]
    InvalidFormat,

    #[error("Please upload a shorter resume. Your PDF has {actual} pages, but we only accept resumes with up to {allowed} pages.")]
    PageLimitExceeded { actual: usize, allowed: usize },

    #[error("Failed to process PDF: {0}")]
    Parse(String),

    #[error("I/O error during extraction: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded file as received. Lives only for the duration of one extraction.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Bytes,
    /// MIME type declared by the uploader. Never sniffed.
    pub content_type: Option<String>,
    pub file_name: String,
}

impl RawDocument {
    pub fn new(
        bytes: impl Into<Bytes>,
        content_type: Option<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
            file_name: file_name.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPage {
    pub page_number: u32,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub file_name: String,
    pub file_size: usize,
    pub total_pages: usize,
    /// Parser-reported document info (title, producer, format version, ...).
    pub pdf_info: serde_json::Map<String, serde_json::Value>,
}

/// Text extracted from a PDF, page by page.
///
/// Fields are private: once built, a document cannot be edited, which keeps
/// `content` equal to the pages joined by [`PAGE_SEPARATOR`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    content: String,
    pages: Vec<ExtractedPage>,
    metadata: DocumentMetadata,
}

impl ExtractedDocument {
    pub(crate) fn new(pages: Vec<ExtractedPage>, metadata: DocumentMetadata) -> Self {
        let content = pages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR);
        Self {
            content,
            pages,
            metadata,
        }
    }

    /// All page contents joined in order.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn pages(&self) -> &[ExtractedPage] {
        &self.pages
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn total_pages(&self) -> usize {
        self.metadata.total_pages
    }

    /// Consumes the document, keeping only the text used as chat résumé context.
    pub fn into_content(self) -> String {
        self.content
    }
}
