//! Axum route handlers for résumé upload.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::document::{process_upload, ExtractedDocument, RawDocument};
use crate::errors::AppError;
use crate::routes::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Multipart field carrying the PDF.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct ParsePdfResponse {
    pub success: bool,
    #[serde(flatten)]
    pub document: ExtractedDocument,
}

/// POST /api/parse-pdf
///
/// Extracts page text from an uploaded résumé. The returned `content` is what the
/// client sends back as `resumeContext` on chat requests.
pub async fn handle_parse_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParsePdfResponse>, AppError> {
    let upload = read_file_field(&mut multipart).await?;
    let document = process_upload(&state.extractor, upload).await?;

    Ok(Json(ParsePdfResponse {
        success: true,
        document,
    }))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Option<RawDocument>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(upload_error)?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(upload_error)?;

        return Ok(Some(RawDocument::new(bytes, content_type, file_name)));
    }
    Ok(None)
}

/// Keeps the status axum assigns to multipart failures: 413 for an upload over the
/// body limit, 400 for anything malformed.
fn upload_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!(
            "File exceeds the {} MiB upload limit",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        ))
    } else {
        AppError::InputValidation(format!("Malformed upload: {}", err.body_text()))
    }
}
