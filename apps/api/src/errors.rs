use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::document::DocumentError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or wrongly typed input. Reported before any expensive work.
    #[error("Validation error: {0}")]
    InputValidation(String),

    /// Request body over the configured upload limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Document parse error: {0}")]
    DocumentParse(String),

    #[error("Please upload a shorter resume. Your PDF has {actual} pages, but we only accept resumes with up to {allowed} pages.")]
    PageLimitExceeded { actual: usize, allowed: usize },

    #[error("Upstream completion error: {0}")]
    UpstreamCompletion(#[from] LlmError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::MissingFile | DocumentError::InvalidFormat => {
                AppError::InputValidation(err.to_string())
            }
            DocumentError::PageLimitExceeded { actual, allowed } => {
                AppError::PageLimitExceeded { actual, allowed }
            }
            DocumentError::Parse(detail) => AppError::DocumentParse(detail),
            DocumentError::Io(e) => AppError::DocumentParse(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::InputValidation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                msg.clone(),
                None,
            ),
            AppError::PageLimitExceeded { .. } => (
                StatusCode::BAD_REQUEST,
                "PAGE_LIMIT_EXCEEDED",
                self.to_string(),
                None,
            ),
            AppError::DocumentParse(detail) => {
                tracing::warn!("PDF parse error: {detail}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "PDF_PARSE_ERROR",
                    "Failed to process PDF".to_string(),
                    Some(detail.clone()),
                )
            }
            AppError::UpstreamCompletion(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "Failed to generate response".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = json!(details);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
