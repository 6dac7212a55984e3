pub mod audio;
pub mod chat;
pub mod rag;
pub mod relay;
pub mod upstream;

pub use audio::{AudioDemoAssets, AudioError};
pub use chat::{ChatMessage, ChatRequest, UpstreamRequest};
pub use rag::{
    FillerMessages, MessageAugmenter, PassthroughAugmenter, RagError, Retriever, StaticRetriever,
};
pub use relay::{FrameStream, OutboundFrame, RelayContext, RelayOutcome, relay, relay_opened};
pub use upstream::{
    ChatCompletionSource, EventStream, OpenAiCompatibleClient, StreamEvent, UpstreamError,
};
