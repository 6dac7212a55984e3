use axum::{Router, routing::post};
use tower_http::trace::TraceLayer;

use crate::handlers::chat;
use crate::state::AppState;
use std::sync::Arc;

/// Create the streaming completion router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/completions", post(chat::chat_completions))
        .route("/rag/chat/completions", post(chat::rag_chat_completions))
        .route("/audio/chat/completions", post(chat::audio_chat_completions))
        .layer(TraceLayer::new_for_http())
}
