//! HTTP client for the chat API.
//!
//! `stream_chat` feeds the response body through [`StreamDecoder`] as bytes arrive
//! and tells a clean finish (`[DONE]` seen) apart from a dropped connection.

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::chat::handlers::{ChatRequest, CompletionResponse, ReviewRequest};
use crate::document::ExtractedDocument;
use crate::stream::{DecodedStream, StreamDecoder};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The stream broke before `[DONE]`. `partial` holds what was received.
    #[error("Stream interrupted: {reason}")]
    Interrupted { partial: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Uploads a résumé PDF and returns the extracted document.
    pub async fn upload_resume(
        &self,
        pdf_bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<ExtractedDocument, ClientError> {
        let part = Part::bytes(pdf_bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/api/parse-pdf", self.base_url))
            .multipart(form)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Buffered chat completion.
    pub async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/chat/complete", self.base_url))
            .json(request)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// One-shot résumé review.
    pub async fn review(&self, request: &ReviewRequest) -> Result<CompletionResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/ai-review", self.base_url))
            .json(request)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Streams a chat reply. `on_delta` gets each new delta together with the
    /// transcript so far; callers pick whether to append or re-render.
    pub async fn stream_chat<F>(
        &self,
        request: &ChatRequest,
        mut on_delta: F,
    ) -> Result<DecodedStream, ClientError>
    where
        F: FnMut(&str, &str),
    {
        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(request)
            .send()
            .await?;
        let response = check(response).await?;

        let mut decoder = StreamDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    return Err(ClientError::Interrupted {
                        partial: decoder.transcript().to_string(),
                        reason: e.to_string(),
                    })
                }
            };
            for delta in decoder.feed(&bytes) {
                on_delta(&delta, decoder.transcript());
            }
            if decoder.is_done() {
                break;
            }
        }

        if decoder.skipped() > 0 {
            debug!(skipped = decoder.skipped(), "Stream contained malformed events");
        }

        let decoded = decoder.finish();
        if !decoded.completed {
            return Err(ClientError::Interrupted {
                partial: decoded.transcript,
                reason: "connection closed before [DONE]".to_string(),
            });
        }
        Ok(decoded)
    }
}

/// Passes successful responses through; turns error responses into `ClientError::Server`.
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}
