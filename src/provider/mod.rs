use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;

use crate::config::ProviderKind;
use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::types::{CapabilityDescriptor, ChatChunk, ChatRequest, ChatResponse};

pub mod google_gemini;
pub mod openai_chat;

pub use google_gemini::GoogleGeminiProvider;
pub use openai_chat::OpenAiChatProvider;

/// Pinned, boxed sequence of stream chunks for a single call.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, LLMError>> + Send>>;

/// Unified provider trait; every backend adapter implements it.
///
/// A provider performs exactly one network attempt per invocation. Retries, deadlines
/// and hooks belong to [`crate::client::LLMClient`].
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Submits a full request and waits for the full response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LLMError>;

    /// Returns incremental chunks. Providers without streaming keep the default,
    /// which fails with [`LLMError::StreamingUnsupported`].
    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, LLMError> {
        let _ = request;
        Err(LLMError::StreamingUnsupported {
            provider: self.name(),
        })
    }

    /// What the provider supports. Must agree with [`LLMProvider::stream_chat`]: a
    /// provider that keeps the default `stream_chat` reports `supports_stream: false`.
    fn capabilities(&self) -> CapabilityDescriptor;

    /// Provider identifier used in errors and logs.
    fn name(&self) -> &'static str;
}

/// Thread-safe provider handle.
pub type DynProvider = Arc<dyn LLMProvider>;

/// Builds the adapter registered for `kind`.
///
/// OpenAI-compatible vendors share [`OpenAiChatProvider`] and only differ in their
/// default base URL. An explicit `base_url` always wins.
pub fn build_provider(
    kind: ProviderKind,
    api_key: impl Into<String>,
    model: impl Into<String>,
    base_url: Option<&str>,
    transport: DynHttpTransport,
) -> DynProvider {
    let base_url = base_url.or(kind.default_base_url());
    match kind {
        ProviderKind::Gemini => {
            let mut provider = GoogleGeminiProvider::new(transport, api_key)
                .with_default_model(model);
            if let Some(base_url) = base_url {
                provider = provider.with_base_url(base_url);
            }
            Arc::new(provider)
        }
        ProviderKind::OpenAi | ProviderKind::DeepSeek | ProviderKind::Groq => {
            let mut provider = OpenAiChatProvider::new(transport, api_key)
                .with_name(kind.as_str())
                .with_default_model(model);
            if let Some(base_url) = base_url {
                provider = provider.with_base_url(base_url);
            }
            Arc::new(provider)
        }
    }
}
