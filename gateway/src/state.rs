use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::rag::{
    FillerMessages, MessageAugmenter, PassthroughAugmenter, RagError, Retriever, StaticRetriever,
};
use crate::core::upstream::{ChatCompletionSource, OpenAiCompatibleClient, UpstreamError};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Rag(#[from] RagError),
}

/// Application state shared by every handler
///
/// Built once at startup from [`ServerConfig`]. `shutdown` is the root token;
/// every request relays under a child of it, so cancelling it ends all
/// in-flight streams.
pub struct AppState {
    pub config: ServerConfig,
    pub upstream: Arc<dyn ChatCompletionSource>,
    pub retriever: Arc<dyn Retriever>,
    pub augmenter: Arc<dyn MessageAugmenter>,
    pub fillers: FillerMessages,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// State backed by the OpenAI-compatible client and the placeholder
    /// retrieval components
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, StateError> {
        let upstream = OpenAiCompatibleClient::new(config.upstream.clone())?;

        if config.upstream.api_key.is_none() {
            info!("No LLM API key configured; completion requests will fail until one is set");
        }

        Self::with_components(
            config,
            Arc::new(upstream),
            Arc::new(StaticRetriever),
            Arc::new(PassthroughAugmenter),
        )
    }

    pub fn with_components(
        config: ServerConfig,
        upstream: Arc<dyn ChatCompletionSource>,
        retriever: Arc<dyn Retriever>,
        augmenter: Arc<dyn MessageAugmenter>,
    ) -> Result<Arc<Self>, StateError> {
        let fillers = FillerMessages::new(config.rag.filler_messages.clone())?;

        Ok(Arc::new(Self {
            config,
            upstream,
            retriever,
            augmenter,
            fillers,
            shutdown: CancellationToken::new(),
        }))
    }

    /// Token for one request, cancelled with the server
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
