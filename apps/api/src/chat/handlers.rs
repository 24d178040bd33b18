//! Axum route handlers for the chat API.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::chat::assembler::{
    deserialize_history, ContextAssembler, ConversationInput, ConversationTurn,
};
use crate::chat::prompts::REVIEW_PROMPT_TEMPLATE;
use crate::errors::AppError;
use crate::llm_client::models::{ModelInfo, MODEL_INFO};
use crate::llm_client::{ChatMessage, Completion, CompletionRequest, Usage, TEMPERATURE};
use crate::state::AppState;
use crate::stream::relay;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_context: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_history",
        skip_serializing_if = "Option::is_none"
    )]
    pub conversation_history: Option<Vec<ConversationTurn>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    pub resume_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub message: String,
    pub model: String,
    pub usage: Usage,
}

impl From<Completion> for CompletionResponse {
    fn from(completion: Completion) -> Self {
        Self {
            message: completion.content,
            model: completion.model,
            usage: completion.usage,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/chat
///
/// Streams the assistant reply as `text/event-stream`. Failures before the first
/// event come back as a JSON error; later failures abort the stream.
pub async fn handle_chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let completion_request = build_chat_request(&state, &request)?;
    relay::stream_response(state.provider.as_ref(), &completion_request).await
}

/// POST /api/chat/complete
///
/// Same context assembly as the streaming route, answered in one piece.
pub async fn handle_chat_complete(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<CompletionResponse>, AppError> {
    let completion_request = build_chat_request(&state, &request)?;
    let completion = relay::complete(state.provider.as_ref(), &completion_request).await?;
    Ok(Json(completion.into()))
}

/// POST /api/ai-review
///
/// One-shot review of an extracted résumé with the default persona.
pub async fn handle_ai_review(
    State(state): State<AppState>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<CompletionResponse>, AppError> {
    if request.resume_text.is_empty() {
        return Err(AppError::InputValidation(
            "Resume text is required".to_string(),
        ));
    }

    let persona = state.personas.default_persona();
    let completion_request = CompletionRequest {
        model: resolve_model(&state, request.model.as_deref()),
        messages: vec![
            ChatMessage::system(persona.system_prompt.clone()),
            ChatMessage::user(REVIEW_PROMPT_TEMPLATE.replace("{resume}", &request.resume_text)),
        ],
        temperature: TEMPERATURE,
        max_tokens: None,
    };

    let completion = relay::complete(state.provider.as_ref(), &completion_request).await?;
    Ok(Json(completion.into()))
}

/// GET /api/models
pub async fn handle_models() -> Json<&'static [ModelInfo]> {
    Json(MODEL_INFO)
}

fn build_chat_request(state: &AppState, request: &ChatRequest) -> Result<CompletionRequest, AppError> {
    if request.message.is_empty() {
        return Err(AppError::InputValidation("Message is required".to_string()));
    }

    let model = resolve_model(state, request.model.as_deref());
    let input = ConversationInput {
        current_message: &request.message,
        resume_context: request.resume_context.as_deref(),
        history: request.conversation_history.as_deref().unwrap_or(&[]),
    };
    let messages = ContextAssembler::new(&state.personas).assemble(&input, &model);

    Ok(CompletionRequest::chat(model, messages))
}

fn resolve_model(state: &AppState, requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(&state.config.default_model)
        .to_string()
}
