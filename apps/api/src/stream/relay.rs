//! Completion relay: provider → wire events → HTTP body.
//!
//! The streaming path is a pull-based pipeline with no spawned task and no queue.
//! An upstream chunk is read only when hyper asks for the next body frame, so a slow
//! client slows the upstream read instead of growing a buffer. When the client goes
//! away, hyper drops the body, which drops the upstream response and closes the
//! provider connection.

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::{ChunkStream, Completion, CompletionProvider, CompletionRequest, LlmError};
use crate::stream::wire::WireEvent;

pub type WireStream = BoxStream<'static, Result<WireEvent, LlmError>>;

/// Buffered mode: one request, whole answer.
pub async fn complete(
    provider: &dyn CompletionProvider,
    request: &CompletionRequest,
) -> Result<Completion, AppError> {
    let completion = provider.complete(request).await?;
    info!(
        model = %completion.model,
        total_tokens = completion.usage.total_tokens,
        "Completion finished"
    );
    Ok(completion)
}

/// Streaming mode. Provider errors before the first chunk come back as `Err` so the
/// caller can still answer with a JSON error instead of an event stream.
pub async fn stream_response(
    provider: &dyn CompletionProvider,
    request: &CompletionRequest,
) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4();
    let chunks = provider.stream(request).await?;
    info!(%request_id, model = %request.model, "Stream started");
    Ok(event_stream_response(wire_events(chunks, request_id)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Streaming,
    Completed,
    Failed,
}

/// Logs how a relayed stream ended once its pipeline is dropped.
struct StreamGuard {
    request_id: Uuid,
    deltas: usize,
    outcome: Outcome,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        match self.outcome {
            Outcome::Completed => info!(
                request_id = %self.request_id,
                deltas = self.deltas,
                "Stream completed"
            ),
            Outcome::Failed => warn!(
                request_id = %self.request_id,
                deltas = self.deltas,
                "Stream aborted after upstream failure"
            ),
            Outcome::Streaming => warn!(
                request_id = %self.request_id,
                deltas = self.deltas,
                "Client disconnected; upstream request abandoned"
            ),
        }
    }
}

struct RelayState {
    chunks: ChunkStream,
    guard: StreamGuard,
}

/// Maps provider chunks to wire events in arrival order. Absent or empty deltas are
/// dropped. A clean provider end yields [`WireEvent::Done`]; a provider error is
/// yielded once and ends the stream without `Done`.
pub fn wire_events(chunks: ChunkStream, request_id: Uuid) -> WireStream {
    let state = RelayState {
        chunks,
        guard: StreamGuard {
            request_id,
            deltas: 0,
            outcome: Outcome::Streaming,
        },
    };

    stream::unfold(state, |mut st| async move {
        if st.guard.outcome != Outcome::Streaming {
            return None;
        }
        loop {
            match st.chunks.next().await {
                Some(Ok(chunk)) => {
                    if let Some(event) = chunk.delta.and_then(WireEvent::delta) {
                        st.guard.deltas += 1;
                        return Some((Ok(event), st));
                    }
                }
                Some(Err(e)) => {
                    error!(request_id = %st.guard.request_id, "Upstream stream failed: {e}");
                    st.guard.outcome = Outcome::Failed;
                    return Some((Err(e), st));
                }
                None => {
                    st.guard.outcome = Outcome::Completed;
                    return Some((Ok(WireEvent::Done), st));
                }
            }
        }
    })
    .boxed()
}

/// Encodes events onto a `text/event-stream` body. An `Err` event aborts the body,
/// so the client sees a broken transfer rather than a clean end.
pub fn event_stream_response(events: WireStream) -> Response {
    let body = Body::from_stream(events.map(|event| event.map(|e| e.encode())));
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}
