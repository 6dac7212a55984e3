//! Chat completion request model.
//!
//! [`ChatRequest`] is what callers POST to every completion endpoint;
//! [`UpstreamRequest`] is what the relay sends to the model provider.

mod messages;
mod upstream_request;

pub use messages::{
    ChatMessage, ChatRequest, ContentPart, ImageReference, MessageText, ResponseFormat, Tool,
    ToolChoice, ToolFunction, UserContent,
};
pub use upstream_request::UpstreamRequest;
