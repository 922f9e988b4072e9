use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// Non-streaming `POST /v1/responses` response body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OpenAiResponsesResponse {
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) output: Vec<ResponsesOutputItem>,
    #[serde(default)]
    pub(crate) usage: Option<ResponsesUsage>,
    #[serde(flatten)]
    #[allow(dead_code)]
    pub(crate) extra: HashMap<String, Value>,
}

/// One item of `response.output`. The `kind` discriminator selects which of
/// the optional fields are populated; unused fields stay `None`/empty.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponsesOutputItem {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) content: Vec<ResponsesContentBlock>,
    #[serde(default)]
    pub(crate) call_id: Option<String>,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) arguments: Option<String>,
    #[serde(default)]
    pub(crate) summary: Vec<ResponsesSummaryBlock>,
    #[serde(default)]
    pub(crate) encrypted_content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponsesContentBlock {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) annotations: Vec<ResponsesAnnotation>,
    #[serde(default)]
    pub(crate) refusal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponsesAnnotation {
    #[serde(default)]
    pub(crate) url: Option<String>,
    #[serde(default)]
    pub(crate) title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponsesSummaryBlock {
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResponsesUsage {
    #[serde(default)]
    pub(crate) input_tokens: u64,
    #[serde(default)]
    pub(crate) output_tokens: u64,
    #[serde(default)]
    pub(crate) input_tokens_details: Option<ResponsesInputTokensDetails>,
    #[serde(default)]
    pub(crate) output_tokens_details: Option<ResponsesOutputTokensDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResponsesInputTokensDetails {
    #[serde(default)]
    pub(crate) cached_tokens: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResponsesOutputTokensDetails {
    #[serde(default)]
    pub(crate) reasoning_tokens: u64,
}

/// One SSE frame. Every `response.*` event type parses into this shape;
/// unused fields stay `None` for event types that don't carry them.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponsesStreamEvent {
    #[serde(rename = "type")]
    pub(crate) event_type: String,
    #[serde(default)]
    pub(crate) output_index: Option<usize>,
    #[serde(default)]
    pub(crate) delta: Option<String>,
    #[serde(default)]
    pub(crate) item: Option<ResponsesOutputItem>,
    #[serde(default)]
    pub(crate) response: Option<OpenAiResponsesResponse>,
}
