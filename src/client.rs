use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tracing::{debug, warn};

use crate::config::{ClientConfig, ProviderKind};
use crate::error::LLMError;
use crate::hooks::{HookResult, Hooks};
use crate::http::DynHttpTransport;
use crate::http::reqwest::default_dyn_transport;
use crate::provider::{ChatStream, DynProvider, build_provider};
use crate::retry::RetryPolicy;
use crate::timeout::guard;
use crate::types::{ChatChunk, ChatOptions, ChatRequest, ChatResponse, Message};

/// Entry point wrapping one provider with deadlines, retries and hooks.
///
/// Every call follows the same path: request hooks fire, the provider call runs under
/// [`RetryPolicy`] with a fresh [`guard`] deadline per attempt, and on success the
/// response is tagged with the provider identifier before response hooks fire. Error
/// hooks see each failed attempt.
///
/// The client is `Send + Sync`; share it behind an `Arc` for concurrent use.
pub struct LLMClient {
    config: ClientConfig,
    kind: ProviderKind,
    model: String,
    provider: DynProvider,
    hooks: Arc<Hooks>,
    retry: RetryPolicy,
}

impl LLMClient {
    /// Builds a client backed by the default reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] when the API key is empty or the provider is
    /// unknown, and [`LLMError::Transport`] if the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, LLMError> {
        let (config, kind) = validated(config)?;
        let transport = default_dyn_transport()?;
        Ok(Self::assemble_with_transport(config, kind, transport))
    }

    /// Builds a client whose adapter sends requests through `transport`.
    pub fn with_transport(
        config: ClientConfig,
        transport: DynHttpTransport,
    ) -> Result<Self, LLMError> {
        let (config, kind) = validated(config)?;
        Ok(Self::assemble_with_transport(config, kind, transport))
    }

    /// Builds a client around an existing provider, bypassing the factory.
    ///
    /// The configuration is validated exactly as in [`LLMClient::new`].
    pub fn with_provider(config: ClientConfig, provider: DynProvider) -> Result<Self, LLMError> {
        let (config, kind) = validated(config)?;
        Ok(Self::assemble(config, kind, provider))
    }

    /// Builds a client from `LLM_*` environment variables.
    ///
    /// See [`ClientConfig::from_lookup`] for the variables read.
    pub fn from_env() -> Result<Self, LLMError> {
        Self::new(ClientConfig::from_env())
    }

    fn assemble_with_transport(
        config: ClientConfig,
        kind: ProviderKind,
        transport: DynHttpTransport,
    ) -> Self {
        let provider = build_provider(
            kind,
            config.api_key.clone(),
            effective_model(&config, kind),
            config.base_url.as_deref(),
            transport,
        );
        Self::assemble(config, kind, provider)
    }

    fn assemble(config: ClientConfig, kind: ProviderKind, provider: DynProvider) -> Self {
        let model = effective_model(&config, kind);
        debug!(provider = kind.as_str(), model = %model, "client ready");
        Self {
            retry: config.retry_policy(),
            config,
            kind,
            model,
            provider,
            hooks: Arc::new(Hooks::new()),
        }
    }

    /// Registers an observer called before each provider call.
    pub fn on_request<F>(&self, hook: F) -> &Self
    where
        F: Fn(&ClientConfig, &ChatRequest) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.add_request(hook);
        self
    }

    /// Registers an observer called with each successful, decorated response.
    pub fn on_response<F>(&self, hook: F) -> &Self
    where
        F: Fn(&ChatResponse) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.add_response(hook);
        self
    }

    /// Registers an observer called once per failed attempt.
    pub fn on_error<F>(&self, hook: F) -> &Self
    where
        F: Fn(&LLMError) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.add_error(hook);
        self
    }

    /// Sends a raw conversation and returns the full response.
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        options: ChatOptions,
    ) -> Result<ChatResponse, LLMError> {
        let request = self.build_request(messages, options);
        self.execute(request).await
    }

    /// Streams the response to a raw conversation.
    ///
    /// Streaming is not retried and has no deadline. Request hooks fire once when the
    /// stream is opened. A failure while opening or iterating is reported to error hooks
    /// and surfaces as [`LLMError::Stream`], after which the stream ends.
    ///
    /// # Errors
    ///
    /// Fails with [`LLMError::StreamingUnsupported`] before any hook runs when the
    /// provider does not advertise streaming. The same error is returned unwrapped, and
    /// without error hooks, if the provider refuses to open a stream it advertised.
    pub async fn chat_stream(
        &self,
        messages: Vec<Message>,
        options: ChatOptions,
    ) -> Result<ChatStream, LLMError> {
        let provider = self.kind.as_str();
        if !self.provider.capabilities().supports_stream {
            return Err(LLMError::StreamingUnsupported { provider });
        }

        let mut request = self.build_request(messages, options);
        request.options.stream = Some(true);
        self.hooks.dispatch_request(&self.config, &request);

        debug!(provider, model = %request.model, "opening stream");
        match self.provider.stream_chat(request).await {
            Ok(inner) => Ok(Box::pin(HookedStream {
                inner: Some(inner),
                hooks: Arc::clone(&self.hooks),
                provider,
            })),
            Err(LLMError::StreamingUnsupported { .. }) => {
                Err(LLMError::StreamingUnsupported { provider })
            }
            Err(err) => {
                warn!(provider, error = %err, "failed to open stream");
                self.hooks.dispatch_error(&err);
                Err(LLMError::Stream {
                    provider,
                    source: Box::new(err),
                })
            }
        }
    }

    /// Runs a prepared request through hooks, retries and the per-attempt deadline.
    pub(crate) async fn execute(&self, request: ChatRequest) -> Result<ChatResponse, LLMError> {
        let provider_name = self.kind.as_str();
        self.hooks.dispatch_request(&self.config, &request);

        let provider = &self.provider;
        let hooks = &self.hooks;
        let deadline = self.config.timeout;
        let mut response = self
            .retry
            .run(
                provider_name,
                |err| hooks.dispatch_error(err),
                || guard(provider_name, deadline, provider.chat(request.clone())),
            )
            .await?;

        response.provider = Some(provider_name.to_string());
        if response.model.is_none() {
            response.model = Some(self.model.clone());
        }
        self.hooks.dispatch_response(&response);
        Ok(response)
    }

    /// Merges per-call overrides with the configured defaults.
    pub(crate) fn build_request(&self, messages: Vec<Message>, options: ChatOptions) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            options: ChatOptions {
                temperature: options.temperature.or(Some(self.config.temperature)),
                max_tokens: options.max_tokens.or(self.config.max_tokens),
                stream: options.stream,
            },
        }
    }

    /// Configuration with the effective model filled in.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Registered provider identifier such as `openai`.
    pub fn provider_name(&self) -> &'static str {
        self.kind.as_str()
    }
}

fn validated(mut config: ClientConfig) -> Result<(ClientConfig, ProviderKind), LLMError> {
    let kind = config.validate()?;
    Ok((config, kind))
}

fn effective_model(config: &ClientConfig, kind: ProviderKind) -> String {
    config
        .model
        .clone()
        .unwrap_or_else(|| kind.default_model().to_string())
}

/// Forwards provider chunks, reporting the first error to the error hooks.
struct HookedStream {
    inner: Option<ChatStream>,
    hooks: Arc<Hooks>,
    provider: &'static str,
}

impl Stream for HookedStream {
    type Item = Result<ChatChunk, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match inner.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Ok(chunk))) => {
                if chunk.done {
                    this.inner = None;
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.inner = None;
                warn!(provider = this.provider, error = %err, "stream failed");
                this.hooks.dispatch_error(&err);
                Poll::Ready(Some(Err(LLMError::Stream {
                    provider: this.provider,
                    source: Box::new(err),
                })))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::provider::LLMProvider;
    use crate::types::CapabilityDescriptor;

    struct Echo;

    #[async_trait]
    impl LLMProvider for Echo {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LLMError> {
            Ok(ChatResponse {
                content: request
                    .messages
                    .last()
                    .map(|message| message.content.clone())
                    .unwrap_or_default(),
                ..Default::default()
            })
        }

        fn capabilities(&self) -> CapabilityDescriptor {
            CapabilityDescriptor::default()
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    fn client(config: ClientConfig) -> LLMClient {
        LLMClient::with_provider(config, Arc::new(Echo)).expect("client")
    }

    #[test]
    fn construction_fills_default_model() {
        let client = client(ClientConfig::new("gemini", "key"));
        assert_eq!(client.model(), "gemini-1.5-flash");
        assert_eq!(client.config().model.as_deref(), Some("gemini-1.5-flash"));
        assert_eq!(client.provider_name(), "gemini");
    }

    #[test]
    fn construction_rejects_empty_key_before_anything_else() {
        let result = LLMClient::with_provider(ClientConfig::new("nope", ""), Arc::new(Echo));
        assert!(matches!(
            result,
            Err(LLMError::InvalidConfig { ref field, .. }) if field == "api_key"
        ));
    }

    #[test]
    fn per_call_options_override_configuration() {
        let client = client(
            ClientConfig::new("openai", "key")
                .with_temperature(0.9)
                .with_max_tokens(100),
        );

        let defaults = client.build_request(vec![Message::user("x")], ChatOptions::default());
        assert_eq!(defaults.options.temperature, Some(0.9));
        assert_eq!(defaults.options.max_tokens, Some(100));
        assert_eq!(defaults.model, "gpt-4o-mini");

        let overridden = client.build_request(
            vec![Message::user("x")],
            ChatOptions::default().with_temperature(0.1).with_max_tokens(5),
        );
        assert_eq!(overridden.options.temperature, Some(0.1));
        assert_eq!(overridden.options.max_tokens, Some(5));
    }

    #[tokio::test]
    async fn response_is_decorated_with_provider_and_model() {
        let client = client(ClientConfig::new("groq", "key"));
        let response = client
            .chat(vec![Message::user("ping")], ChatOptions::default())
            .await
            .expect("response");
        assert_eq!(response.content, "ping");
        assert_eq!(response.provider.as_deref(), Some("groq"));
        assert_eq!(response.model.as_deref(), Some("llama-3.1-8b-instant"));
    }

    #[tokio::test]
    async fn echo_provider_cannot_stream() {
        let client = client(ClientConfig::new("openai", "key"));
        match client
            .chat_stream(vec![Message::user("x")], ChatOptions::default())
            .await
        {
            Err(LLMError::StreamingUnsupported { provider }) => assert_eq!(provider, "openai"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected failure"),
        }
    }
}
