use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info};

use crate::document::backend::{ParsedPdf, PdfBackend};
use crate::document::{
    DocumentError, DocumentMetadata, ExtractedDocument, ExtractedPage, RawDocument,
    PAGE_SEPARATOR,
};

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// One entry per PDF page when true, a single merged entry otherwise.
    pub split_pages: bool,
    /// Joins the text items found on one line.
    pub item_separator: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            split_pages: true,
            item_separator: " ".to_string(),
        }
    }
}

/// Turns uploaded PDF bytes into ordered page text plus metadata.
///
/// Holds no mutable state, so one instance is shared by all requests.
pub struct DocumentExtractor {
    backend: Arc<dyn PdfBackend>,
    options: ExtractOptions,
}

impl DocumentExtractor {
    pub fn new(backend: Arc<dyn PdfBackend>, options: ExtractOptions) -> Self {
        Self { backend, options }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Extracts on the blocking thread pool so parsing never stalls the executor.
    pub async fn extract(
        self: &Arc<Self>,
        raw: RawDocument,
    ) -> Result<ExtractedDocument, DocumentError> {
        let extractor = Arc::clone(self);
        tokio::task::spawn_blocking(move || extractor.extract_blocking(&raw))
            .await
            .map_err(|e| DocumentError::Parse(format!("extraction task failed: {e}")))?
    }

    /// Synchronous extraction. A panicking parser is reported as a parse failure.
    pub fn extract_blocking(&self, raw: &RawDocument) -> Result<ExtractedDocument, DocumentError> {
        let parsed = catch_unwind(AssertUnwindSafe(|| self.backend.parse(&raw.bytes)))
            .map_err(|payload| DocumentError::Parse(panic_message(payload.as_ref())))??;

        let document = self.build_document(raw, parsed);

        info!(
            file = %raw.file_name,
            size = raw.size(),
            pages = document.total_pages(),
            backend = self.backend.name(),
            "PDF extracted"
        );
        for page in document.pages() {
            debug!(page = page.page_number, "{}", page.content);
        }

        Ok(document)
    }

    fn build_document(&self, raw: &RawDocument, parsed: ParsedPdf) -> ExtractedDocument {
        let mut pages: Vec<ExtractedPage> = parsed
            .pages
            .iter()
            .map(|page| ExtractedPage {
                page_number: page.number,
                content: normalize_page(&page.text, &self.options.item_separator),
            })
            .collect();

        let extracted_count = pages.len();

        if !self.options.split_pages && !pages.is_empty() {
            let merged = pages
                .iter()
                .map(|p| p.content.as_str())
                .collect::<Vec<_>>()
                .join(PAGE_SEPARATOR);
            pages = vec![ExtractedPage {
                page_number: 1,
                content: merged,
            }];
        }

        let metadata = DocumentMetadata {
            file_name: raw.file_name.clone(),
            file_size: raw.size(),
            total_pages: parsed.total_pages.unwrap_or(extracted_count),
            pdf_info: parsed.info,
        };

        ExtractedDocument::new(pages, metadata)
    }
}

/// Collapses layout whitespace: items on a line are joined with `separator`,
/// blank lines are dropped.
fn normalize_page(text: &str, separator: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(separator))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("parser panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::backend::test_pdf::pdf_with_pages;
    use crate::document::backend::{InMemoryBackend, RawPage};
    use serde_json::Map;

    struct FixedBackend {
        parsed: ParsedPdf,
    }

    impl PdfBackend for FixedBackend {
        fn parse(&self, _pdf_bytes: &[u8]) -> Result<ParsedPdf, DocumentError> {
            Ok(self.parsed.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct PanickingBackend;

    impl PdfBackend for PanickingBackend {
        fn parse(&self, _pdf_bytes: &[u8]) -> Result<ParsedPdf, DocumentError> {
            panic!("xref table exploded");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    fn raw(bytes: Vec<u8>) -> RawDocument {
        RawDocument::new(bytes, Some("application/pdf".to_string()), "resume.pdf")
    }

    fn fixed(pages: &[(u32, &str)], total_pages: Option<usize>) -> DocumentExtractor {
        let parsed = ParsedPdf {
            pages: pages
                .iter()
                .map(|(n, t)| RawPage {
                    number: *n,
                    text: t.to_string(),
                })
                .collect(),
            total_pages,
            info: Map::new(),
        };
        DocumentExtractor::new(Arc::new(FixedBackend { parsed }), ExtractOptions::default())
    }

    #[test]
    fn test_single_page_scenario() {
        let extractor =
            DocumentExtractor::new(Arc::new(InMemoryBackend), ExtractOptions::default());
        let doc = extractor
            .extract_blocking(&raw(pdf_with_pages(&["Name: Jane Doe"])))
            .unwrap();
        assert_eq!(
            doc.pages(),
            &[ExtractedPage {
                page_number: 1,
                content: "Name: Jane Doe".to_string()
            }]
        );
        assert_eq!(doc.total_pages(), 1);
        assert_eq!(doc.metadata().file_name, "resume.pdf");
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor =
            DocumentExtractor::new(Arc::new(InMemoryBackend), ExtractOptions::default());
        let bytes = pdf_with_pages(&["Jane Doe", "Rust Engineer"]);
        let first = extractor.extract_blocking(&raw(bytes.clone())).unwrap();
        let second = extractor.extract_blocking(&raw(bytes)).unwrap();
        assert_eq!(first.content(), second.content());
        assert_eq!(first, second);
    }

    #[test]
    fn test_content_is_pages_joined() {
        let doc = fixed(&[(1, "Jane  Doe\n\n  Engineer "), (2, "Skills:\tRust")], None)
            .extract_blocking(&raw(vec![]))
            .unwrap();
        assert_eq!(doc.pages()[0].content, "Jane Doe\nEngineer");
        assert_eq!(doc.pages()[1].content, "Skills: Rust");
        let joined = doc
            .pages()
            .iter()
            .map(|p| p.content.clone())
            .collect::<Vec<_>>()
            .join("\n\n");
        assert_eq!(doc.content(), joined);
    }

    #[test]
    fn test_page_numbers_follow_parser_order() {
        let doc = fixed(&[(1, "a"), (3, "c")], Some(3))
            .extract_blocking(&raw(vec![]))
            .unwrap();
        let numbers: Vec<u32> = doc.pages().iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(doc.total_pages(), 3);
    }

    #[test]
    fn test_total_pages_falls_back_to_extracted_count() {
        let doc = fixed(&[(1, "a"), (2, "b")], None)
            .extract_blocking(&raw(vec![]))
            .unwrap();
        assert_eq!(doc.total_pages(), 2);
    }

    #[test]
    fn test_custom_item_separator() {
        let parsed = ParsedPdf {
            pages: vec![RawPage {
                number: 1,
                text: "Jane   Doe".to_string(),
            }],
            total_pages: Some(1),
            info: Map::new(),
        };
        let extractor = DocumentExtractor::new(
            Arc::new(FixedBackend { parsed }),
            ExtractOptions {
                split_pages: true,
                item_separator: "|".to_string(),
            },
        );
        let doc = extractor.extract_blocking(&raw(vec![])).unwrap();
        assert_eq!(doc.content(), "Jane|Doe");
    }

    #[test]
    fn test_unsplit_pages_merge_into_one_entry() {
        let parsed = ParsedPdf {
            pages: vec![
                RawPage {
                    number: 1,
                    text: "one".to_string(),
                },
                RawPage {
                    number: 2,
                    text: "two".to_string(),
                },
            ],
            total_pages: Some(2),
            info: Map::new(),
        };
        let extractor = DocumentExtractor::new(
            Arc::new(FixedBackend { parsed }),
            ExtractOptions {
                split_pages: false,
                item_separator: " ".to_string(),
            },
        );
        let doc = extractor.extract_blocking(&raw(vec![])).unwrap();
        assert_eq!(doc.pages().len(), 1);
        assert_eq!(doc.pages()[0].page_number, 1);
        assert_eq!(doc.content(), "one\n\ntwo");
        assert_eq!(doc.total_pages(), 2);
    }

    #[test]
    fn test_parser_panic_becomes_parse_error() {
        let extractor =
            DocumentExtractor::new(Arc::new(PanickingBackend), ExtractOptions::default());
        let err = extractor.extract_blocking(&raw(vec![])).unwrap_err();
        match err {
            DocumentError::Parse(detail) => assert!(detail.contains("xref table exploded")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_async_extract_runs_off_executor() {
        let extractor = Arc::new(DocumentExtractor::new(
            Arc::new(InMemoryBackend),
            ExtractOptions::default(),
        ));
        let doc = extractor
            .extract(raw(pdf_with_pages(&["Async page"])))
            .await
            .unwrap();
        assert_eq!(doc.content(), "Async page");
    }

    #[tokio::test]
    async fn test_concurrent_extractions_do_not_interfere() {
        let extractor = Arc::new(DocumentExtractor::new(
            Arc::new(InMemoryBackend),
            ExtractOptions::default(),
        ));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let extractor = Arc::clone(&extractor);
                tokio::spawn(async move {
                    let text = format!("Candidate {i}");
                    let doc = extractor
                        .extract(raw(pdf_with_pages(&[text.as_str()])))
                        .await
                        .unwrap();
                    (text, doc.content().to_string())
                })
            })
            .collect();
        for handle in handles {
            let (expected, actual) = handle.await.unwrap();
            assert_eq!(expected, actual);
        }
    }
}
