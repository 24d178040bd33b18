// Chat: persona selection, context assembly and the chat/review endpoints.
// All model calls go through llm_client via the relay; nothing here talks HTTP upstream.

pub mod assembler;
pub mod handlers;
pub mod persona;
pub mod prompts;

pub use assembler::{ContextAssembler, ConversationInput, ConversationTurn, HISTORY_WINDOW};
pub use persona::{Persona, PersonaRegistry};
