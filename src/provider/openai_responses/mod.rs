//! Adapter for the OpenAI Responses API (`/v1/responses`).

mod error;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::OpenAiResponsesProvider;
