//! Adapter for the OpenAI Chat Completions API (`/v1/chat/completions`).

mod error;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::OpenAiChatProvider;
