use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resume_chat::chat::PersonaRegistry;
use resume_chat::config::{Config, PdfBackendKind};
use resume_chat::document::{
    DocumentExtractor, ExtractOptions, InMemoryBackend, PdfBackend, PdftotextBackend,
};
use resume_chat::llm_client::OpenRouterClient;
use resume_chat::routes::build_router;
use resume_chat::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Chat API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM provider
    let provider = OpenRouterClient::new(&config)?;
    info!(
        "LLM provider initialized (base URL: {}, default model: {})",
        config.openrouter_base_url, config.default_model
    );

    // Persona registry: built-ins plus optional file overrides
    let mut personas = PersonaRegistry::builtin();
    if let Some(path) = &config.personas_file {
        personas = personas.extend_from_file(path)?;
    }
    info!(
        "Persona registry ready ({} model-specific personas)",
        personas.models().count()
    );

    // PDF extraction backend
    let backend: Arc<dyn PdfBackend> = match config.pdf_backend {
        PdfBackendKind::InMemory => Arc::new(InMemoryBackend),
        PdfBackendKind::Pdftotext => {
            if !PdftotextBackend::is_available() {
                anyhow::bail!("PDF_BACKEND=pdftotext but pdftotext is not installed");
            }
            Arc::new(PdftotextBackend)
        }
    };
    let extractor = DocumentExtractor::new(backend, ExtractOptions::default());
    info!("PDF extractor initialized (backend: {})", extractor.backend_name());

    // Build app state
    let state = AppState {
        config: config.clone(),
        provider: Arc::new(provider),
        personas: Arc::new(personas),
        extractor: Arc::new(extractor),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to SITE_URL once the frontend is deployed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
