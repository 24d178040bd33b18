//! Context assembly: builds the message list sent to the model.
//!
//! Order is fixed: one system entry (persona prompt, plus the résumé block when a
//! résumé was uploaded), then at most [`HISTORY_WINDOW`] recent user/assistant turns,
//! then the current message as the final user entry.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::chat::persona::PersonaRegistry;
use crate::chat::prompts::RESUME_CONTEXT_TEMPLATE;
use crate::llm_client::ChatMessage;

/// Most recent history entries kept per request.
pub const HISTORY_WINDOW: usize = 10;

/// A prior turn as the client sent it. Fields that are missing or not strings are
/// `None`; such turns still occupy a slot in the window but are dropped during assembly,
/// as is any role other than `user` or `assistant`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ConversationTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: Some(content.into()),
        }
    }

    fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            role: text("role"),
            content: text("content"),
        }
    }
}

/// `deserialize_with` helper for request history: anything other than an array is
/// treated as absent, and malformed entries become empty turns instead of errors.
pub fn deserialize_history<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<ConversationTurn>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(items.iter().map(ConversationTurn::from_value).collect()),
        _ => None,
    })
}

/// Inputs for one chat request.
#[derive(Debug, Clone, Copy)]
pub struct ConversationInput<'a> {
    pub current_message: &'a str,
    pub resume_context: Option<&'a str>,
    pub history: &'a [ConversationTurn],
}

/// Everything the model will see for one request, before flattening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationContext {
    pub system_prompt: String,
    pub resume_context: Option<String>,
    /// Already windowed and filtered.
    pub history: Vec<ChatMessage>,
    pub current_message: String,
}

impl ConversationContext {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        let mut system = self.system_prompt;
        if let Some(resume) = &self.resume_context {
            system.push_str(&RESUME_CONTEXT_TEMPLATE.replace("{resume}", resume));
        }

        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(self.history);
        messages.push(ChatMessage::user(self.current_message));
        messages
    }
}

pub struct ContextAssembler<'a> {
    personas: &'a PersonaRegistry,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(personas: &'a PersonaRegistry) -> Self {
        Self { personas }
    }

    pub fn context_for(&self, input: &ConversationInput<'_>, model_id: &str) -> ConversationContext {
        let persona = self.personas.resolve(model_id);

        ConversationContext {
            system_prompt: persona.system_prompt.clone(),
            resume_context: input
                .resume_context
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            history: window_history(input.history),
            current_message: input.current_message.to_string(),
        }
    }

    pub fn assemble(&self, input: &ConversationInput<'_>, model_id: &str) -> Vec<ChatMessage> {
        self.context_for(input, model_id).into_messages()
    }
}

/// Last [`HISTORY_WINDOW`] entries, then role filtering. Windowing happens first, so
/// dropped entries are not replaced by older ones.
fn window_history(history: &[ConversationTurn]) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .filter_map(|turn| {
            let content = turn.content.clone()?;
            match turn.role.as_deref() {
                Some("user") => Some(ChatMessage::user(content)),
                Some("assistant") => Some(ChatMessage::assistant(content)),
                _ => None,
            }
        })
        .collect()
}
