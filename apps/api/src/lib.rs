//! Résumé chat service: PDF résumé extraction, conversation-context assembly and a
//! token-streaming relay, plus a client that decodes the stream.

pub mod chat;
pub mod client;
pub mod config;
pub mod document;
pub mod errors;
pub mod llm_client;
pub mod routes;
pub mod state;
pub mod stream;
