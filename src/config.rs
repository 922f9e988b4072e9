//! Declarative configuration for constructing provider adapters.
//!
//! `ModelConfig` is the serializable description of one callable backend —
//! applications load these from files or environment and hand them to each
//! adapter's `from_model_config` constructor rather than wiring up transport
//! and credentials by hand.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Describes one callable backend: which provider surface, which
/// credential, and any passthrough settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Caller-chosen handle, e.g. `"default-openai"`.
    pub handle: String,
    pub provider: ProviderKind,
    pub credential: Credential,
    pub default_model: Option<String>,
    pub base_url: Option<String>,
    /// Provider-specific passthrough settings, e.g. `service_tier` or
    /// `safety_settings`.
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

/// The six provider surfaces this crate adapts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAiChat,
    OpenAiResponses,
    AnthropicMessages,
    GoogleGemini,
    Cohere,
    Mistral,
}

/// Authentication material for a [`ModelConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    /// A plain API key, sent under `header` (provider default if `None`).
    ApiKey {
        header: Option<String>,
        key: String,
    },
    /// A bearer token sent as `Authorization: Bearer <token>`.
    Bearer { token: String },
    /// A Google/GCP service account JSON document.
    ServiceAccount { json: Value },
    /// No authentication required, e.g. a local proxy.
    None,
}
