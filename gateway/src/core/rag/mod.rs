//! Retrieval-augmented completion support.
//!
//! The augmented endpoint sends one filler frame, retrieves context for the
//! conversation, rewrites the message list with it and then relays the
//! provider stream. Retrieval and rewriting sit behind [`Retriever`] and
//! [`MessageAugmenter`]; the defaults are placeholders that return a fixed
//! string and leave messages untouched.

mod filler;

pub use filler::{FillerMessages, WAITING_FRAME_ID, waiting_frame};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::chat::ChatMessage;

/// Text returned by [`StaticRetriever`]
pub const STATIC_RETRIEVAL_CONTENT: &str =
    "This is relevant content retrieved from the knowledge base.";

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("No filler messages configured")]
    NoFillerMessages,
}

/// Looks up knowledge-base content relevant to a conversation
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, messages: &[ChatMessage]) -> Result<String, RagError>;
}

/// Folds retrieved context into the message list sent upstream
pub trait MessageAugmenter: Send + Sync {
    fn augment(&self, context: &str, messages: Vec<ChatMessage>) -> Vec<ChatMessage>;
}

/// Always returns [`STATIC_RETRIEVAL_CONTENT`]
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever;

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _messages: &[ChatMessage]) -> Result<String, RagError> {
        Ok(STATIC_RETRIEVAL_CONTENT.to_string())
    }
}

/// Returns the messages unchanged
#[derive(Debug, Clone, Default)]
pub struct PassthroughAugmenter;

impl MessageAugmenter for PassthroughAugmenter {
    fn augment(&self, _context: &str, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        messages
    }
}
