use std::sync::Arc;

use tracing::warn;

use crate::document::{DocumentError, DocumentExtractor, ExtractedDocument, RawDocument};

/// Résumés longer than this are rejected after extraction.
pub const MAX_PAGES: usize = 2;

const PDF_MIME: &str = "application/pdf";

/// Cheap pre-extraction gate: the upload must exist and be declared as a PDF.
/// Runs before any parser work.
pub fn validate_upload(upload: Option<&RawDocument>) -> Result<&RawDocument, DocumentError> {
    let upload = upload.ok_or(DocumentError::MissingFile)?;

    let is_pdf = upload
        .content_type
        .as_deref()
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME))
        .unwrap_or(false);

    if !is_pdf {
        return Err(DocumentError::InvalidFormat);
    }
    Ok(upload)
}

/// Post-extraction gate: page count is only known once the parser has run.
pub fn validate_page_count(
    document: &ExtractedDocument,
    max_pages: usize,
) -> Result<(), DocumentError> {
    let actual = document.total_pages();
    if actual > max_pages {
        return Err(DocumentError::PageLimitExceeded {
            actual,
            allowed: max_pages,
        });
    }
    Ok(())
}

/// Full upload pipeline, cheapest check first: format → extraction → page limit.
/// Nothing from a rejected document is retained.
pub async fn process_upload(
    extractor: &Arc<DocumentExtractor>,
    upload: Option<RawDocument>,
) -> Result<ExtractedDocument, DocumentError> {
    validate_upload(upload.as_ref())?;
    let Some(upload) = upload else {
        return Err(DocumentError::MissingFile);
    };
    let file_name = upload.file_name.clone();

    let document = extractor.extract(upload).await?;

    if let Err(e) = validate_page_count(&document, MAX_PAGES) {
        warn!(file = %file_name, pages = document.total_pages(), "Rejected oversized resume");
        return Err(e);
    }
    Ok(document)
}
