use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::stream::framing::DONE_SENTINEL;

/// JSON body of a delta event: `{"content": "<delta>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaPayload {
    pub content: String,
}

/// One event on the chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// Non-empty text fragment. Build with [`WireEvent::delta`].
    Delta(String),
    /// Clean end of the completion.
    Done,
}

impl WireEvent {
    /// `None` for empty text: empty deltas are never put on the wire.
    pub fn delta(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.is_empty()).then_some(WireEvent::Delta(text))
    }

    /// `data: {"content":"..."}` or `data: [DONE]`, each followed by a blank line.
    pub fn encode(&self) -> Bytes {
        match self {
            WireEvent::Delta(content) => {
                let payload = DeltaPayload {
                    content: content.clone(),
                };
                // Serializing a struct with one string field cannot fail.
                let json = serde_json::to_string(&payload).unwrap_or_default();
                Bytes::from(format!("data: {json}\n\n"))
            }
            WireEvent::Done => Bytes::from(format!("data: {DONE_SENTINEL}\n\n")),
        }
    }
}
