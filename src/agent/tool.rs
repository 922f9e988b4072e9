use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LanguageModelError;
use crate::types::{JsonSchema, Part};

/// Caller-defined tool a model may call during a Run (§4.6 step 6).
///
/// Implementations are arbitrary user code; the Run loop executes one or
/// more of these concurrently per turn (§9, "Tool execution concurrency").
/// A tool that needs to serialize its own calls must do so internally — the
/// Run makes no ordering guarantee across tool calls in the same turn.
#[async_trait]
pub trait AgentTool<C>: Send + Sync {
    /// Must match the name the model was offered in the request.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema describing the shape of `args` passed to [`execute`](Self::execute).
    fn parameters(&self) -> JsonSchema;

    /// Executes the tool against parsed call arguments and the Run's
    /// context value.
    ///
    /// Returning `Err` is captured by the Run as an `is_error=true`
    /// tool-result and fed back to the model; it never aborts the Run.
    async fn execute(&self, args: Value, context: C) -> Result<Vec<Part>, LanguageModelError>;
}

/// Thread-safe handle to an [`AgentTool`] implementation.
pub type DynAgentTool<C> = Arc<dyn AgentTool<C>>;
