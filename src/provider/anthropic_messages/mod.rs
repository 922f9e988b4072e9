//! Adapter for the Anthropic Messages API (`/v1/messages`).

mod error;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::AnthropicMessagesProvider;
