//! Tool-executing agent run loop built on top of the [`crate::provider::LanguageModel`]
//! facade (§4.6/§4.7).
//!
//! An [`Agent`] is a stateless blueprint: a model, a set of static/dynamic
//! instructions, a static tool set, and zero or more [`Toolkit`] factories
//! that mint per-Run [`ToolkitSession`]s. A [`Run`] (driven by [`run`] or
//! [`run_streamed`]) owns the mutable turn-taking state described in §4.6's
//! state machine.

mod config;
mod event;
mod instruction;
mod items;
mod run;
mod tool;
mod toolkit;

pub use config::Agent;
pub use event::{AgentStreamEvent, CancellationToken, ItemEventData, PartialEventData, ResponseEventData};
pub use instruction::Instruction;
pub use items::{AgentItem, ModelItem, ToolItem};
pub use run::{run, run_streamed, AgentEventStream, AgentRequest, RunResponse};
pub use tool::{AgentTool, DynAgentTool};
pub use toolkit::{DynToolkit, Toolkit, ToolkitSession};
