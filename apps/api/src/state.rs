use std::sync::Arc;

use crate::chat::PersonaRegistry;
use crate::config::Config;
use crate::document::DocumentExtractor;
use crate::llm_client::CompletionProvider;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Completion backend. OpenRouter in production, scripted stubs in tests.
    pub provider: Arc<dyn CompletionProvider>,
    pub personas: Arc<PersonaRegistry>,
    pub extractor: Arc<DocumentExtractor>,
}
