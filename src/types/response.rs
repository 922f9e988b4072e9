use serde::{Deserialize, Serialize};

use super::message::{ContentDelta, Part};
use super::usage::ModelUsage;

/// The finalized result of one `generate` call, or of folding a `stream`
/// call's [`PartialModelResponse`]s through the
/// [`crate::accumulator::StreamAccumulator`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub usage: Option<ModelUsage>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cost: Option<f64>,
}

/// One frame of a `stream` call. May carry a content delta, a usage
/// increment, a cost increment, or any combination — a usage-only frame
/// (`delta: None`) is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialModelResponse {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub delta: Option<ContentDelta>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub usage: Option<ModelUsage>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cost: Option<f64>,
}
