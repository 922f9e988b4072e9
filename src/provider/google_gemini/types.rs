use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level `GenerateContentResponse`, shared by the non-streaming response
/// and each streamed chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct GeminiGenerateContentResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<GeminiCandidate>,
    #[serde(default, rename = "usageMetadata")]
    pub(crate) usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default, rename = "modelVersion")]
    pub(crate) model_version: Option<String>,
    #[serde(default, rename = "responseId")]
    pub(crate) response_id: Option<String>,
    #[serde(flatten)]
    #[allow(dead_code)]
    pub(crate) extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub(crate) content: Option<GeminiContent>,
    #[serde(default, rename = "finishReason")]
    pub(crate) finish_reason: Option<String>,
    #[serde(default)]
    pub(crate) index: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default)]
    pub(crate) parts: Vec<GeminiPart>,
    #[serde(default)]
    pub(crate) role: Option<String>,
}

/// One `Content.part`. The populated optional field selects the part's kind;
/// exactly one is expected to be `Some` per part.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct GeminiPart {
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    pub(crate) inline_data: Option<GeminiInlineData>,
    #[serde(default, rename = "functionCall", alias = "function_call")]
    pub(crate) function_call: Option<GeminiFunctionCall>,
    #[serde(default, rename = "functionResponse", alias = "function_response")]
    pub(crate) function_response: Option<GeminiFunctionResponse>,
    #[serde(default, rename = "thought")]
    pub(crate) thought: Option<bool>,
    #[serde(default, rename = "thoughtSignature", alias = "thought_signature")]
    pub(crate) thought_signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiInlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    pub(crate) mime_type: String,
    pub(crate) data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiFunctionCall {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiFunctionResponse {
    pub(crate) name: String,
    pub(crate) response: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    pub(crate) prompt_token_count: u64,
    #[serde(rename = "cachedContentTokenCount", default)]
    pub(crate) cached_content_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    pub(crate) candidates_token_count: u64,
    #[serde(rename = "thoughtsTokenCount", default)]
    pub(crate) thoughts_token_count: u64,
}
