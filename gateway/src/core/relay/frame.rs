use bytes::Bytes;
use serde_json::Value;

/// Terminal sentinel payload
pub const DONE_SENTINEL: &str = "[DONE]";

/// One server-sent event pushed to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// `data: <json>\n\n`
    Data(Value),
    /// `data: [DONE]\n\n`, always the last frame of a completed stream
    Done,
}

impl OutboundFrame {
    /// Encode the frame in SSE wire format
    pub fn encode(&self) -> Bytes {
        match self {
            OutboundFrame::Data(payload) => Bytes::from(format!("data: {payload}\n\n")),
            OutboundFrame::Done => Bytes::from_static(b"data: [DONE]\n\n"),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, OutboundFrame::Done)
    }
}
