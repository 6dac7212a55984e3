use rand::seq::SliceRandom;
use serde_json::{Value, json};

use super::RagError;

/// `id` of the filler frame sent before retrieval starts
pub const WAITING_FRAME_ID: &str = "waiting_msg";

/// Non-empty set of "please wait" phrases
#[derive(Debug, Clone)]
pub struct FillerMessages {
    phrases: Vec<String>,
}

impl FillerMessages {
    pub fn new(phrases: Vec<String>) -> Result<Self, RagError> {
        if phrases.is_empty() {
            return Err(RagError::NoFillerMessages);
        }
        Ok(Self { phrases })
    }

    /// Uniform random pick
    pub fn pick(&self) -> &str {
        self.phrases
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

/// Assistant delta carrying `filler`, shaped like a provider chunk
pub fn waiting_frame(filler: &str) -> Value {
    json!({
        "id": WAITING_FRAME_ID,
        "choices": [{
            "index": 0,
            "delta": {"role": "assistant", "content": filler},
            "finish_reason": null
        }]
    })
}
