//! Base trait and types for upstream completion sources.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::chat::UpstreamRequest;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised while opening or reading an upstream stream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The provider did not answer in time
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Missing or rejected credential
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Provider refused the request
    #[error("Provider rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// A streamed event could not be decoded
    #[error("Invalid event payload: {0}")]
    InvalidEvent(String),

    /// Transport failure after the stream was established
    #[error("Stream error: {0}")]
    Stream(String),

    /// The request was cancelled before or during streaming
    #[error("Request was cancelled")]
    Cancelled,
}

/// Result type for upstream operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

// =============================================================================
// Events
// =============================================================================

/// Coarse classification of a streamed chunk, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    TextDelta,
    AudioDelta,
    ToolCallDelta,
    Finish,
    Other,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TextDelta => "text_delta",
            EventKind::AudioDelta => "audio_delta",
            EventKind::ToolCallDelta => "tool_call_delta",
            EventKind::Finish => "finish",
            EventKind::Other => "other",
        }
    }
}

/// One increment of a streamed completion
///
/// The provider's JSON is kept verbatim so the caller receives exactly what the
/// provider sent.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    payload: Value,
}

impl StreamEvent {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Classify by the first choice: a finish reason wins over any delta
    pub fn kind(&self) -> EventKind {
        let Some(choice) = self.payload.get("choices").and_then(|c| c.get(0)) else {
            return EventKind::Other;
        };

        if choice
            .get("finish_reason")
            .is_some_and(|reason| !reason.is_null())
        {
            return EventKind::Finish;
        }

        let Some(delta) = choice.get("delta") else {
            return EventKind::Other;
        };

        if delta.get("tool_calls").is_some_and(|v| !v.is_null()) {
            EventKind::ToolCallDelta
        } else if delta.get("audio").is_some_and(|v| !v.is_null()) {
            EventKind::AudioDelta
        } else if delta.get("content").is_some_and(Value::is_string) {
            EventKind::TextDelta
        } else {
            EventKind::Other
        }
    }
}

/// Ordered, single-consumer stream of upstream events
pub type EventStream = Pin<Box<dyn Stream<Item = UpstreamResult<StreamEvent>> + Send>>;

// =============================================================================
// Source trait
// =============================================================================

/// A provider able to stream chat completions.
///
/// `open_stream` resolves once the provider has accepted the request, so any
/// error it returns happens before the first byte is sent to the caller.
/// Implementations must stop reading and return or yield
/// [`UpstreamError::Cancelled`] once `cancel` fires.
#[async_trait]
pub trait ChatCompletionSource: Send + Sync {
    async fn open_stream(
        &self,
        request: UpstreamRequest,
        cancel: CancellationToken,
    ) -> UpstreamResult<EventStream>;

    /// Short provider name for logs
    fn name(&self) -> &str {
        "upstream"
    }
}
