//! Adapter for the Cohere Chat API (`/v2/chat`).

mod error;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::CohereProvider;
