//! Streaming chat completion handlers.
//!
//! All three endpoints answer with `text/event-stream`. Anything that fails
//! before the response is returned (validation, opening the provider stream,
//! loading the audio demo files) becomes a JSON error response; later failures
//! only shorten the stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::audio::AudioDemoAssets;
use crate::core::chat::{ChatRequest, UpstreamRequest};
use crate::core::rag::waiting_frame;
use crate::core::relay::{FrameStream, OutboundFrame, RelayContext, relay, relay_opened};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

const STREAMING_REQUIRED: &str = "chat completions require streaming";

/// Relay a completion from the configured provider
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Response> {
    let request_id = new_request_id();
    let request = accept_request(payload, &request_id, "chat")?;

    let cancel = state.request_token();
    let pending = PendingRequest::new(&request_id, "chat", cancel.clone());

    let upstream_request =
        UpstreamRequest::passthrough(&request, state.config.upstream.default_model.as_deref());
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        opened = state.upstream.open_stream(upstream_request, cancel.clone()) => {
            opened.map_err(AppError::from)
        }
    };
    pending.disarm();
    let events = opened.map_err(|e| log_rejection(&request_id, "chat", e))?;

    let ctx = RelayContext::new(request_id, "chat", cancel);
    Ok(sse_response(relay_opened(ctx, events)))
}

/// Send a filler frame, then relay a completion over retrieval-augmented
/// messages
pub async fn rag_chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Response> {
    let request_id = new_request_id();
    let request = accept_request(payload, &request_id, "rag")?;

    let cancel = state.request_token();
    if cancel.is_cancelled() {
        return Err(log_rejection(&request_id, "rag", AppError::Cancelled));
    }

    let lead = vec![OutboundFrame::Data(waiting_frame(state.fillers.pick()))];

    let open = {
        let state = state.clone();
        let cancel = cancel.clone();
        async move {
            let context = state
                .retriever
                .retrieve(&request.messages)
                .await
                .map_err(AppError::from)?;
            let messages = state.augmenter.augment(&context, request.messages.clone());
            let upstream_request = UpstreamRequest::from_chat(
                &request,
                messages,
                state.config.upstream.default_model.as_deref(),
            );
            state
                .upstream
                .open_stream(upstream_request, cancel)
                .await
                .map_err(AppError::from)
        }
    };

    let ctx = RelayContext::new(request_id, "rag", cancel);
    Ok(sse_response(relay(ctx, lead, open)))
}

/// Replay the local transcript and PCM file as audio deltas
pub async fn audio_chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Response> {
    let request_id = new_request_id();
    accept_request(payload, &request_id, "audio")?;

    let cancel = state.request_token();
    let pending = PendingRequest::new(&request_id, "audio", cancel.clone());

    let loaded = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        loaded = AudioDemoAssets::load(&state.config.audio_demo) => loaded.map_err(AppError::from),
    };
    pending.disarm();
    let assets = loaded.map_err(|e| log_rejection(&request_id, "audio", e))?;

    let ctx = RelayContext::new(request_id, "audio", cancel);
    Ok(sse_response(relay_opened(ctx, assets.into_event_stream())))
}

/// Cancels the request token when the handler is dropped before the response
/// is built, which is how a client disconnect surfaces at this point.
struct PendingRequest {
    request_id: String,
    variant: &'static str,
    cancel: CancellationToken,
    armed: bool,
}

impl PendingRequest {
    fn new(request_id: &str, variant: &'static str, cancel: CancellationToken) -> Self {
        Self {
            request_id: request_id.to_string(),
            variant,
            cancel,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        if self.armed {
            self.cancel.cancel();
            info!(
                request_id = %self.request_id,
                variant = self.variant,
                "Request was cancelled before streaming"
            );
        }
    }
}

fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Decode the body and reject non-streaming requests
fn accept_request(
    payload: Result<Json<ChatRequest>, JsonRejection>,
    request_id: &str,
    variant: &'static str,
) -> AppResult<ChatRequest> {
    let Json(request) = payload
        .map_err(|e| log_rejection(request_id, variant, AppError::validation(e.body_text())))?;

    info!(
        request_id = %request_id,
        variant,
        model = ?request.model,
        messages = request.messages.len(),
        tools = request.declared_tools().map_or(0, <[_]>::len),
        "Received chat completion request"
    );

    if !request.stream {
        return Err(log_rejection(
            request_id,
            variant,
            AppError::validation(STREAMING_REQUIRED),
        ));
    }

    Ok(request)
}

fn log_rejection(request_id: &str, variant: &'static str, err: AppError) -> AppError {
    match &err {
        AppError::Validation(reason) => {
            warn!(request_id = %request_id, variant, reason = %reason, "Rejected request")
        }
        AppError::Cancelled => {
            info!(request_id = %request_id, variant, "Request was cancelled before streaming")
        }
        other => {
            error!(request_id = %request_id, variant, error = %other, "Request failed before streaming")
        }
    }
    err
}

fn sse_response(frames: FrameStream) -> Response {
    let body = Body::from_stream(frames.map(|frame| Ok::<_, Infallible>(frame.encode())));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (
                header::HeaderName::from_static("x-accel-buffering"),
                HeaderValue::from_static("no"),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_pending_request_cancels_token() {
        let cancel = CancellationToken::new();
        drop(PendingRequest::new("req", "chat", cancel.clone()));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_disarmed_pending_request_leaves_token() {
        let cancel = CancellationToken::new();
        PendingRequest::new("req", "audio", cancel.clone()).disarm();
        assert!(!cancel.is_cancelled());
    }
}
