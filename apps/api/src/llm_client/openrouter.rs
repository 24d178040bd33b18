//! OpenRouter (OpenAI-compatible `/chat/completions`) provider.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::llm_client::{
    ChatMessage, ChunkStream, Completion, CompletionProvider, CompletionRequest, LlmError,
    StreamChunk, Usage,
};
use crate::stream::framing::{data_payload, LineBuffer, DONE_SENTINEL};

const MAX_RETRIES: u32 = 3;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Applies to buffered calls only; streams may legitimately run longer.
const BUFFERED_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// A single SSE `data: {...}` chunk from the upstream stream.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Wraps the chat-completions API with retry on the initial request.
/// Once a stream has started, failures are surfaced rather than retried.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
    site_url: String,
    site_name: String,
}

impl OpenRouterClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?,
            api_key: config.openrouter_api_key.clone(),
            base_url: config.openrouter_base_url.trim_end_matches('/').to_string(),
            site_url: config.site_url.clone(),
            site_name: config.site_name.clone(),
        })
    }

    /// Posts the request, retrying on 429 (rate limit) and 5xx errors with
    /// exponential backoff. Returns the first successful response.
    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<Response, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ApiRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut builder = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .header("HTTP-Referer", &self.site_url)
                .header("X-Title", &self.site_name)
                .json(&body);
            builder = if stream {
                builder.header("Accept", "text/event-stream")
            } else {
                builder.timeout(BUFFERED_TIMEOUT)
            };

            let response = match builder.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(retryable_failure(status, body, attempt));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES - 1,
        }))
    }
}

/// Error kept for a retryable response. `attempt` counts the retries already made.
fn retryable_failure(status: StatusCode, body: String, attempt: u32) -> LlmError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        LlmError::RateLimited { retries: attempt }
    } else {
        LlmError::Api {
            status: status.as_u16(),
            message: body,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let response = self.send(request, false).await?;
        let api: ApiResponse = response.json().await?;

        let content = api
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyContent)?;
        let usage = api.usage.unwrap_or_default();

        debug!(
            model = %api.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "LLM call succeeded"
        );

        Ok(Completion {
            content,
            model: api.model,
            usage,
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream, LlmError> {
        debug!(model = %request.model, "Sending streaming request");
        let response = self.send(request, true).await?;
        Ok(upstream_chunks(response.bytes_stream().boxed()))
    }
}

struct UpstreamState {
    bytes: BoxStream<'static, reqwest::Result<Bytes>>,
    lines: LineBuffer,
    saw_finish: bool,
    finished: bool,
}

enum UpstreamLine {
    Skip,
    Done,
    Chunk(StreamChunk, bool),
    Failed(LlmError),
}

/// Turns the upstream SSE body into provider chunks, pulling bytes only as chunks
/// are requested. EOF without `[DONE]` or a finish reason counts as an interruption.
fn upstream_chunks(bytes: BoxStream<'static, reqwest::Result<Bytes>>) -> ChunkStream {
    let state = UpstreamState {
        bytes,
        lines: LineBuffer::new(),
        saw_finish: false,
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }
        loop {
            while let Some(line) = st.lines.next_line() {
                match parse_upstream_line(&line) {
                    UpstreamLine::Skip => continue,
                    UpstreamLine::Done => return None,
                    UpstreamLine::Chunk(chunk, is_finish) => {
                        st.saw_finish |= is_finish;
                        return Some((Ok(chunk), st));
                    }
                    UpstreamLine::Failed(e) => {
                        st.finished = true;
                        return Some((Err(e), st));
                    }
                }
            }

            match st.bytes.next().await {
                Some(Ok(bytes)) => st.lines.push(&bytes),
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(LlmError::StreamInterrupted(e.to_string())), st));
                }
                None if st.saw_finish => return None,
                None => {
                    st.finished = true;
                    let err = LlmError::StreamInterrupted(
                        "upstream closed the stream before completion".to_string(),
                    );
                    return Some((Err(err), st));
                }
            }
        }
    })
    .boxed()
}

fn parse_upstream_line(line: &[u8]) -> UpstreamLine {
    let Ok(line) = std::str::from_utf8(line) else {
        trace!("Ignoring non-UTF-8 SSE line");
        return UpstreamLine::Skip;
    };
    // Blank separators and ": OPENROUTER PROCESSING" keep-alive comments.
    let Some(data) = data_payload(line.trim_end()) else {
        return UpstreamLine::Skip;
    };
    let data = data.trim();
    if data == DONE_SENTINEL {
        return UpstreamLine::Done;
    }

    match serde_json::from_str::<StreamResponse>(data) {
        Ok(resp) => {
            if let Some(error) = resp.error {
                let status = error
                    .code
                    .as_ref()
                    .and_then(|c| c.as_u64())
                    .and_then(|c| u16::try_from(c).ok())
                    .unwrap_or(0);
                return UpstreamLine::Failed(LlmError::Api {
                    status,
                    message: error.message,
                });
            }
            let Some(choice) = resp.choices.into_iter().next() else {
                return UpstreamLine::Skip;
            };
            let is_finish = choice.finish_reason.is_some();
            let delta = choice.delta.and_then(|d| d.content);
            UpstreamLine::Chunk(StreamChunk { delta }, is_finish)
        }
        Err(e) => {
            trace!(data = %data, error = %e, "Ignoring unparseable SSE chunk");
            UpstreamLine::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(parts: &[&'static str]) -> BoxStream<'static, reqwest::Result<Bytes>> {
        let items: Vec<reqwest::Result<Bytes>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
        stream::iter(items).boxed()
    }

    async fn collect(parts: &[&'static str]) -> Vec<Result<StreamChunk, LlmError>> {
        upstream_chunks(body(parts)).collect().await
    }

    #[tokio::test]
    async fn test_parses_deltas_across_fragmented_reads() {
        let chunks = collect(&[
            ": OPENROUTER PROCESSING\n\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"Hel\"}}]}\n",
            "\ndata: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]",
            "}\n\ndata: [DO",
            "NE]\n\n",
        ])
        .await;
        let deltas: Vec<Option<String>> = chunks.into_iter().map(|c| c.unwrap().delta).collect();
        assert_eq!(deltas, vec![Some("Hel".to_string()), Some("lo".to_string())]);
    }

    #[tokio::test]
    async fn test_null_delta_content_is_none() {
        let chunks = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":null}}]}\n\n",
            "data: [DONE]\n\n",
        ])
        .await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta, None);
    }

    #[tokio::test]
    async fn test_finish_reason_allows_eof_without_done() {
        let chunks = collect(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"bye\"},\"finish_reason\":\"stop\"}]}\n\n",
        ])
        .await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_ok());
    }

    #[tokio::test]
    async fn test_eof_before_completion_is_interruption() {
        let chunks = collect(&["data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\n"]).await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        assert!(matches!(chunks[1], Err(LlmError::StreamInterrupted(_))));
    }

    #[tokio::test]
    async fn test_upstream_error_payload_ends_stream() {
        let chunks = collect(&[
            "data: {\"error\":{\"message\":\"model overloaded\",\"code\":503}}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ])
        .await;
        assert_eq!(chunks.len(), 1);
        match &chunks[0] {
            Err(LlmError::Api { status, message }) => {
                assert_eq!(*status, 503);
                assert_eq!(message, "model overloaded");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_error_code_maps_to_zero() {
        let chunks = collect(&["data: {\"error\":{\"message\":\"odd\",\"code\":70000}}\n\n"]).await;
        assert!(matches!(&chunks[0], Err(LlmError::Api { status: 0, .. })));
    }

    #[test]
    fn test_last_429_reports_rate_limit() {
        let err = retryable_failure(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string(), 2);
        assert!(matches!(err, LlmError::RateLimited { retries: 2 }));
        assert_eq!(err.to_string(), "Rate limited after 2 retries");

        let err = retryable_failure(StatusCode::BAD_GATEWAY, "upstream down".to_string(), 2);
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_chunk_is_skipped() {
        let chunks = collect(&[
            "data: {not json}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n",
            "data: [DONE]\n\n",
        ])
        .await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta.as_deref(), Some("ok"));
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = ApiRequest {
            model: "m",
            messages: &messages,
            temperature: 0.7,
            max_tokens: Some(2000),
            stream: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["max_tokens"], 2000);
        assert_eq!(json["stream"], true);
    }
}
