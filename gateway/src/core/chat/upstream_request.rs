use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use super::messages::{ChatMessage, ChatRequest, ResponseFormat, Tool, ToolChoice};

/// Body of the streaming call opened against the model provider
///
/// `stream` is always true. `context` and `parallel_tool_calls` from the
/// caller's request are not forwarded.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpstreamRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    pub modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<Value>,
}

impl UpstreamRequest {
    /// Build the upstream call for `request`, sending `messages` in place of
    /// the caller's own list.
    ///
    /// The tool choice is only forwarded when the caller declared at least one
    /// tool; providers reject a tool choice without tools.
    pub fn from_chat(
        request: &ChatRequest,
        messages: Vec<ChatMessage>,
        default_model: Option<&str>,
    ) -> Self {
        let tools = request.declared_tools().map(<[Tool]>::to_vec);
        let tool_choice = match tools {
            Some(_) => request.tool_choice.clone(),
            None => None,
        };

        Self {
            model: request
                .model
                .clone()
                .or_else(|| default_model.map(str::to_string)),
            messages,
            tool_choice,
            tools,
            modalities: request.modalities.clone(),
            audio: request.audio.clone(),
            response_format: request.response_format.clone(),
            stream: true,
            stream_options: request.stream_options.clone(),
        }
    }

    /// Forward the caller's messages unmodified
    pub fn passthrough(request: &ChatRequest, default_model: Option<&str>) -> Self {
        Self::from_chat(request, request.messages.clone(), default_model)
    }
}
