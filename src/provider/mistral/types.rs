use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralChatResponse {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) object: Option<String>,
    #[serde(default)]
    pub(crate) model: Option<String>,
    pub(crate) choices: Vec<MistralResponseChoice>,
    #[serde(default)]
    pub(crate) usage: Option<MistralUsage>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralResponseChoice {
    pub(crate) index: usize,
    pub(crate) message: Option<MistralResponseMessage>,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralResponseMessage {
    #[serde(default)]
    pub(crate) role: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<MistralMessageContent>,
    #[serde(default)]
    pub(crate) tool_calls: Option<Vec<MistralToolCallResponse>>,
    /// Present on some Mistral responses that cite retrieved documents.
    /// The wire shape for this is not documented anywhere in the example
    /// pack; its mere presence is enough to surface `NotImplemented`
    /// rather than guess at a mapping.
    #[serde(default)]
    pub(crate) citations: Option<Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub(crate) enum MistralMessageContent {
    Text(String),
    Parts(Vec<MistralMessagePart>),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralMessagePart {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(flatten)]
    pub(crate) extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralToolCallResponse {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(rename = "type", default)]
    pub(crate) kind: Option<String>,
    pub(crate) function: Option<MistralToolFunction>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralToolFunction {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) arguments: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralUsage {
    #[serde(default)]
    pub(crate) prompt_tokens: Option<u64>,
    #[serde(default)]
    pub(crate) completion_tokens: Option<u64>,
    #[serde(default)]
    pub(crate) total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralStreamChunk {
    #[serde(default)]
    pub(crate) choices: Vec<MistralStreamChoice>,
    #[serde(default)]
    pub(crate) usage: Option<MistralUsage>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralStreamChoice {
    pub(crate) index: usize,
    #[serde(default)]
    pub(crate) delta: Option<MistralStreamDelta>,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralStreamDelta {
    #[serde(default)]
    pub(crate) role: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<MistralDeltaContent>,
    #[serde(default)]
    pub(crate) tool_calls: Option<Vec<MistralToolCallDelta>>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub(crate) enum MistralDeltaContent {
    Parts(Vec<MistralMessagePart>),
    Text(String),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralToolCallDelta {
    #[serde(default)]
    pub(crate) index: Option<usize>,
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(rename = "type", default)]
    pub(crate) kind: Option<String>,
    #[serde(default)]
    pub(crate) function: Option<MistralToolFunctionDelta>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub(crate) struct MistralToolFunctionDelta {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) arguments: Option<String>,
}
