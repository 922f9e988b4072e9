use serde::{Deserialize, Serialize};

use super::usage::Pricing;

/// Capability flags a [`crate::provider::LanguageModel`] reports about
/// itself, consumed by the agent loop and by callers deciding whether to
/// route a request to a given model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageModelCapability {
    pub supports_streaming: bool,
    pub supports_tools: bool,
    pub supports_parallel_tool_calls: bool,
    pub supports_structured_output: bool,
    pub supports_image_input: bool,
    pub supports_audio_input: bool,
    pub supports_reasoning: bool,
}

/// Static metadata for one model/provider pairing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageModelMetadata {
    pub capability: LanguageModelCapability,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pricing: Option<Pricing>,
}
