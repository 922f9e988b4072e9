//! Provider adapters and the [`LanguageModel`] facade they each implement.
//!
//! Every adapter owns three pure mappings (request, response, stream) plus
//! two I/O operations (`generate`, `stream`), per §4.2. The facade lets the
//! agent run loop and callers depend on one interface regardless of which
//! concrete provider backs it.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::LanguageModelError;
use crate::types::{LanguageModelInput, LanguageModelMetadata, ModelResponse, PartialModelResponse};

pub mod anthropic_messages;
pub mod cohere;
pub mod google_gemini;
pub mod mistral;
pub mod openai_chat;
pub mod openai_responses;

/// Lazy finite sequence of [`PartialModelResponse`]s, per §4.1/§9. Adapters
/// must emit frames as the provider yields them rather than buffering the
/// whole stream.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<PartialModelResponse, LanguageModelError>> + Send>>;

/// One interface every provider adapter implements (§4.1).
///
/// Implementations must be safe for concurrent invocation: model instances
/// are intended to be shared across concurrent calls (§5, Shared-resource
/// policy).
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider identifier, e.g. `"openai.responses"`, `"anthropic"`.
    fn provider(&self) -> &'static str;

    /// Concrete model id this instance targets, e.g. `"gpt-4o"`.
    fn model_id(&self) -> &str;

    /// Capability flags and optional pricing for this model.
    fn metadata(&self) -> LanguageModelMetadata;

    /// Invokes the model and waits for the complete response.
    ///
    /// When usage is present and pricing is configured on [`metadata`],
    /// implementations must set `cost = usage · pricing`.
    ///
    /// # Errors
    /// See the error taxonomy in `crate::error`: `InvalidInput`,
    /// `Unsupported`, `NotImplemented`, `Provider`, `Refusal`, `Invariant`,
    /// `Transport`, `Cancelled`.
    async fn generate(&self, input: LanguageModelInput) -> Result<ModelResponse, LanguageModelError>;

    /// Invokes the model and returns a lazy stream of partial responses.
    ///
    /// Folding the returned stream through
    /// [`crate::accumulator::StreamAccumulator`] must produce the same
    /// `ModelResponse` [`generate`] would for a deterministic input.
    ///
    /// # Errors
    /// Same taxonomy as [`generate`].
    async fn stream(&self, input: LanguageModelInput) -> Result<ChatStream, LanguageModelError>;
}

/// Thread-safe handle to a [`LanguageModel`] implementation.
pub type DynLanguageModel = std::sync::Arc<dyn LanguageModel>;

pub(crate) fn require_non_empty_messages(
    provider: &'static str,
    input: &LanguageModelInput,
) -> Result<(), LanguageModelError> {
    if input.messages.is_empty() {
        return Err(LanguageModelError::InvalidInput(format!(
            "{provider}: messages must not be empty"
        )));
    }
    for message in &input.messages {
        message.validate()?;
    }
    validate_tool_result_ids(provider, input)
}

/// Invariant from §3.1: a tool-result's `tool_call_id` must match a prior
/// tool-call's `tool_call_id` in the same conversation.
fn validate_tool_result_ids(
    provider: &'static str,
    input: &LanguageModelInput,
) -> Result<(), LanguageModelError> {
    use std::collections::HashSet;

    use crate::types::Part;

    let mut seen_call_ids: HashSet<&str> = HashSet::new();
    for message in &input.messages {
        for part in &message.content {
            match part {
                Part::ToolCall(call) => {
                    seen_call_ids.insert(call.tool_call_id.as_str());
                }
                Part::ToolResult(result) => {
                    if !seen_call_ids.contains(result.tool_call_id.as_str()) {
                        return Err(LanguageModelError::InvalidInput(format!(
                            "{provider}: tool-result {} has no matching prior tool-call",
                            result.tool_call_id
                        )));
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, Part};

    #[test]
    fn rejects_empty_messages() {
        let input = LanguageModelInput::new(Vec::new());
        let err = require_non_empty_messages("test", &input).unwrap_err();
        assert!(matches!(err, LanguageModelError::InvalidInput(_)));
    }

    #[test]
    fn rejects_dangling_tool_result() {
        let input = LanguageModelInput::new(vec![Message::tool(vec![Part::tool_result(
            "call_1", "t", vec![], false,
        )])]);
        let err = require_non_empty_messages("test", &input).unwrap_err();
        assert!(matches!(err, LanguageModelError::InvalidInput(_)));
    }

    #[test]
    fn accepts_matching_tool_call_and_result() {
        let input = LanguageModelInput::new(vec![
            Message::assistant(vec![Part::tool_call("call_1", "t", None)]),
            Message::tool(vec![Part::tool_result("call_1", "t", vec![], false)]),
        ]);
        require_non_empty_messages("test", &input).unwrap();
    }
}
