//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `chat` - Streaming chat completion endpoints (plain, augmented, audio demo)

pub mod api;
pub mod chat;

pub use chat::{audio_chat_completions, chat_completions, rag_chat_completions};
