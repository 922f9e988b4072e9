use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::Message;
use super::tool::{Tool, ToolChoice};

/// `response_format` selector. `Text` is the default; `Json` without a
/// schema selects generic JSON mode; `Json` with a schema selects
/// structured-output mode (strict where the provider supports it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResponseFormat {
    Text,
    Json {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        schema: Option<Value>,
    },
}

/// Output modalities a caller may request from a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
    Image,
}

/// Audio output configuration, honored only when `modalities` includes
/// [`Modality::Audio`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioOptions {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub format: Option<super::message::AudioFormat>,
}

/// Reasoning/thinking activation. `enabled=true` turns on the provider's
/// thinking surface (Anthropic `thinking`, Google `thinkingConfig`, OpenAI
/// reasoning summaries); `budget_tokens` passes through where supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningOptions {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub budget_tokens: Option<u32>,
}

/// Everything needed to invoke a [`crate::provider::LanguageModel`] once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageModelInput {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub modalities: Vec<Modality>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub audio: Option<AudioOptions>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reasoning: Option<ReasoningOptions>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<HashMap<String, String>>,
    /// Opaque, passed through verbatim to the provider request body.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub extra: Map<String, Value>,
}

impl LanguageModelInput {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }
}
