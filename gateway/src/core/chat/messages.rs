use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Request
// =============================================================================

/// Caller-supplied chat completion payload
///
/// Field defaults follow the OpenAI chat completions API: text-only output,
/// `tool_choice = "auto"`, parallel tool calls enabled and streaming on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// Free-form bag supplied by the calling platform, never forwarded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(default = "default_modalities")]
    pub modalities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(default = "default_tool_choice")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default = "default_true")]
    pub parallel_tool_calls: bool,
    /// Must be true; non-streaming requests are rejected
    #[serde(default = "default_true")]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<Value>,
}

fn default_modalities() -> Vec<String> {
    vec!["text".to_string()]
}

fn default_tool_choice() -> Option<ToolChoice> {
    Some(ToolChoice::Mode("auto".to_string()))
}

fn default_true() -> bool {
    true
}

impl ChatRequest {
    /// Tools declared by the caller, `None` when the list is absent or empty
    pub fn declared_tools(&self) -> Option<&[Tool]> {
        self.tools.as_deref().filter(|tools| !tools.is_empty())
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Role-tagged conversation message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System {
        content: MessageText,
    },
    User {
        content: UserContent,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<UserContent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio: Option<HashMap<String, String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<Value>>,
    },
    Tool {
        content: MessageText,
        tool_call_id: String,
    },
}

impl ChatMessage {
    pub fn role(&self) -> &'static str {
        match self {
            ChatMessage::System { .. } => "system",
            ChatMessage::User { .. } => "user",
            ChatMessage::Assistant { .. } => "assistant",
            ChatMessage::Tool { .. } => "tool",
        }
    }
}

/// Plain text content, either a single string or a list of strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageText {
    Text(String),
    Parts(Vec<String>),
}

/// User content: a string or a list of typed parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multi-part message
///
/// `image` and `image_url` are both accepted and forwarded with the tag the
/// caller used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { image_url: ImageReference },
    ImageUrl { image_url: ImageReference },
    InputAudio { input_audio: HashMap<String, String> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ImageReference {
    Url(String),
    Object {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

// =============================================================================
// Tools and response format
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    #[serde(rename = "type", default = "default_function_type")]
    pub kind: String,
    pub function: ToolFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolFunction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub strict: bool,
}

/// Tool selection policy: `"auto"`/`"none"`/`"required"` or a named function
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(String),
    Function {
        #[serde(rename = "type", default = "default_function_type")]
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function: Option<Value>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseFormat {
    #[serde(rename = "type", default = "default_response_format_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<Value>,
}

fn default_function_type() -> String {
    "function".to_string()
}

fn default_response_format_type() -> String {
    "json_schema".to_string()
}
