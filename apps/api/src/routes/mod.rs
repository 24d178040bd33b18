pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat;
use crate::document::handlers as document;
use crate::state::AppState;

/// Uploads larger than this are refused before the handler runs.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/models", get(chat::handle_models))
        // Document API
        .route(
            "/api/parse-pdf",
            post(document::handle_parse_pdf).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Chat API
        .route("/api/chat", post(chat::handle_chat_stream))
        .route("/api/chat/complete", post(chat::handle_chat_complete))
        .route("/api/ai-review", post(chat::handle_ai_review))
        .with_state(state)
}
