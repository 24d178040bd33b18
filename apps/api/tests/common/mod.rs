//! Shared fixtures for the integration tests: a scripted completion provider,
//! app state wired around it and fixture PDFs.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use resume_chat::chat::PersonaRegistry;
use resume_chat::config::Config;
use resume_chat::document::backend::test_pdf::build_pdf;
use resume_chat::document::{DocumentExtractor, ExtractOptions, InMemoryBackend};
use resume_chat::llm_client::{
    ChunkStream, Completion, CompletionProvider, CompletionRequest, LlmError, StreamChunk, Usage,
};
use resume_chat::state::AppState;

/// Provider that replays a fixed list of deltas and records every request it sees.
pub struct ScriptedProvider {
    deltas: Vec<String>,
    /// Break the stream after this many deltas.
    fail_after: Option<usize>,
    /// Refuse the request before anything is streamed.
    reject: bool,
    delay: Duration,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn replying(deltas: &[&str]) -> Self {
        Self {
            deltas: deltas.iter().map(|d| d.to_string()).collect(),
            fail_after: None,
            reject: false,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_after(deltas: &[&str], count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::replying(deltas)
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::replying(&[])
        }
    }

    /// Pause before each item so every event is flushed on its own.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: &CompletionRequest) -> Result<(), LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.reject {
            return Err(LlmError::Api {
                status: 503,
                message: "provider unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        self.record(request)?;
        Ok(Completion {
            content: self.deltas.concat(),
            model: request.model.clone(),
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        })
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream, LlmError> {
        self.record(request)?;

        let mut items: Vec<Result<StreamChunk, LlmError>> = Vec::new();
        for (i, delta) in self.deltas.iter().enumerate() {
            if self.fail_after == Some(i) {
                break;
            }
            items.push(Ok(StreamChunk::text(delta.clone())));
        }
        if self.fail_after.is_some() {
            items.push(Err(LlmError::StreamInterrupted(
                "upstream connection reset".to_string(),
            )));
        }

        let delay = self.delay;
        Ok(stream::iter(items)
            .then(move |item| async move {
                tokio::time::sleep(delay).await;
                item
            })
            .boxed())
    }
}

pub fn test_state(provider: Arc<ScriptedProvider>) -> AppState {
    AppState {
        config: Config::with_provider("test-key", "http://127.0.0.1:9"),
        provider,
        personas: Arc::new(PersonaRegistry::builtin()),
        extractor: Arc::new(DocumentExtractor::new(
            Arc::new(InMemoryBackend),
            ExtractOptions::default(),
        )),
    }
}

pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    build_pdf(pages).unwrap()
}
