use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LanguageModelError;

use super::tool::DynAgentTool;

/// Factory for per-Run [`ToolkitSession`]s (§4.7).
///
/// A Toolkit is a stateless blueprint, like [`super::Agent`] itself;
/// `create_session` is called once per Run, at Run start, before any model
/// call. Failure aborts the Run before the model is ever invoked.
#[async_trait]
pub trait Toolkit<C>: Send + Sync {
    async fn create_session(&self, context: C) -> Result<Box<dyn ToolkitSession<C>>, LanguageModelError>;
}

/// Thread-safe handle to a [`Toolkit`] implementation.
pub type DynToolkit<C> = Arc<dyn Toolkit<C>>;

/// A single Run's live handle to a [`Toolkit`] (§4.7).
///
/// `system_prompt` and `tools` are re-queried at the start of every turn, so
/// a session can evolve its surface (e.g. hide a tool once a precondition
/// stops holding) as the Run progresses. Tools listed at turn N are valid
/// targets for calls the model makes at turn N only; a tool that
/// disappears at turn N+1 makes a stale call an unknown-tool error.
///
/// Single-owner: one session belongs to exactly one Run and is released
/// (via `close`) exactly once, when that Run ends.
#[async_trait]
pub trait ToolkitSession<C>: Send + Sync {
    async fn system_prompt(&self) -> Option<String> {
        None
    }

    async fn tools(&self) -> Vec<DynAgentTool<C>> {
        Vec::new()
    }

    async fn close(self: Box<Self>) {}
}
