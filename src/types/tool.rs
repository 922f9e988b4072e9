use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON Schema object, kept opaque — the crate never interprets schema
/// contents beyond forwarding them to the provider.
pub type JsonSchema = Value;

/// A tool definition offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub parameters: JsonSchema,
}

/// Selector controlling whether and which tool the model must call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    Tool { tool_name: String },
}
