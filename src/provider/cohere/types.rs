use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cohere Chat (v2) non-streaming response envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct CohereChatResponse {
    #[serde(default)]
    pub(crate) id: Option<String>,
    pub(crate) message: CohereResponseMessage,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
    #[serde(default)]
    pub(crate) usage: Option<CohereUsage>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct CohereResponseMessage {
    #[serde(default)]
    pub(crate) role: Option<String>,
    #[serde(default)]
    pub(crate) content: Vec<CohereContentBlock>,
    #[serde(default)]
    pub(crate) tool_calls: Option<Vec<CohereToolCall>>,
    #[serde(default)]
    pub(crate) citations: Option<Vec<CohereCitation>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct CohereContentBlock {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) thinking: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct CohereToolCall {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) function: CohereToolFunction,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct CohereToolFunction {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) arguments: Option<String>,
}

/// A grounding citation. `sources` is the provenance the cited span draws
/// from; mapped to [`crate::types::SourcePart`] (§3.1's citation substrate).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct CohereCitation {
    #[serde(default)]
    pub(crate) start: Option<u32>,
    #[serde(default)]
    pub(crate) end: Option<u32>,
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) sources: Vec<CohereCitationSource>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct CohereCitationSource {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) document: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct CohereUsage {
    #[serde(default)]
    pub(crate) tokens: Option<CohereTokenCounts>,
    #[serde(default)]
    pub(crate) billed_units: Option<CohereTokenCounts>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct CohereTokenCounts {
    #[serde(default)]
    pub(crate) input_tokens: Option<f64>,
    #[serde(default)]
    pub(crate) output_tokens: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CohereErrorEnvelope {
    #[serde(default)]
    pub(crate) message: Option<String>,
}

/// Streaming event envelope for Cohere's `/v2/chat` SSE protocol.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum CohereStreamEvent {
    #[serde(rename = "message-start")]
    MessageStart,
    #[serde(rename = "content-start")]
    ContentStart { index: usize },
    #[serde(rename = "content-delta")]
    ContentDelta {
        index: usize,
        delta: CohereContentDeltaBody,
    },
    #[serde(rename = "content-end")]
    ContentEnd { index: usize },
    #[serde(rename = "tool-plan-delta")]
    ToolPlanDelta { delta: CohereToolPlanDeltaBody },
    #[serde(rename = "tool-call-start")]
    ToolCallStart {
        index: usize,
        delta: CohereToolCallDeltaBody,
    },
    #[serde(rename = "tool-call-delta")]
    ToolCallDelta {
        index: usize,
        delta: CohereToolCallDeltaBody,
    },
    #[serde(rename = "tool-call-end")]
    ToolCallEnd { index: usize },
    #[serde(rename = "citation-start")]
    CitationStart {
        index: usize,
        delta: CohereCitationDeltaBody,
    },
    #[serde(rename = "citation-end")]
    CitationEnd { index: usize },
    #[serde(rename = "message-end")]
    MessageEnd { delta: CohereMessageEndDeltaBody },
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CohereContentDeltaBody {
    pub(crate) message: CohereContentDeltaMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CohereContentDeltaMessage {
    pub(crate) content: CohereContentDeltaText,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CohereContentDeltaText {
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) thinking: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CohereToolPlanDeltaBody {
    #[serde(default)]
    pub(crate) tool_plan: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CohereToolCallDeltaBody {
    pub(crate) message: CohereToolCallDeltaMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CohereToolCallDeltaMessage {
    pub(crate) tool_calls: CohereToolCallDeltaCall,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CohereToolCallDeltaCall {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) function: Option<CohereToolFunction>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CohereCitationDeltaBody {
    pub(crate) message: CohereCitationDeltaMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CohereCitationDeltaMessage {
    pub(crate) citations: CohereCitation,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CohereMessageEndDeltaBody {
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
    #[serde(default)]
    pub(crate) usage: Option<CohereUsage>,
}
