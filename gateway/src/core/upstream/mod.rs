//! Upstream model providers.
//!
//! The relay talks to providers through [`ChatCompletionSource`]. The only
//! built-in implementation is [`OpenAiCompatibleClient`], which speaks the
//! OpenAI chat completions streaming protocol.

mod base;
mod openai;

pub use base::{
    ChatCompletionSource, EventKind, EventStream, StreamEvent, UpstreamError, UpstreamResult,
};
pub use openai::OpenAiCompatibleClient;
