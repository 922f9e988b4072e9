//! Cross-provider LLM client and agent runtime.
//!
//! One normalized request/response shape ([`types::LanguageModelInput`],
//! [`types::ModelResponse`]) is translated to and from each provider's wire
//! protocol by the adapters under [`provider`]. [`agent`] builds a
//! stateful, tool-executing run loop on top of the [`provider::LanguageModel`]
//! facade.

pub mod accumulator;
pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod part_utils;
pub mod provider;
pub mod stream;
pub mod tracing_model;
pub mod types;

pub use accumulator::StreamAccumulator;
pub use error::{LanguageModelError, LanguageModelResult};
pub use provider::{ChatStream, DynLanguageModel, LanguageModel};
pub use tracing_model::TracingLanguageModel;
pub use types::*;
