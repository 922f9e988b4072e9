//! Adapter for the Mistral Chat Completions API (`/v1/chat/completions`).

mod error;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::MistralProvider;
