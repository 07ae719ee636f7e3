//! OpenAI chat completions adapter, also used for OpenAI-compatible vendors.

mod error;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::OpenAiChatProvider;
