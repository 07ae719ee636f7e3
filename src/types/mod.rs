//! Shared data structures modeling chat requests, responses and stream chunks.
//!
//! These types normalize provider-specific payloads so the orchestrator and the task
//! helpers can stay agnostic of individual API differences.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Chat role understood by every supported provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single text message in a conversation.
///
/// # Examples
///
/// ```
/// # use kotoba_assist::types::{Message, Role};
/// let msg = Message::user("Summarize Rust traits.");
/// assert_eq!(msg.role, Role::User);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role associated with this message.
    pub role: Role,
    /// Plain UTF-8 text.
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Per-call overrides layered on top of the client configuration.
///
/// Every field is optional so callers only set the knobs they care about; the
/// orchestrator fills the rest from [`crate::config::ClientConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Sampling temperature, typically within `0.0..=2.0`.
    pub temperature: Option<f32>,
    /// Maximum number of output tokens returned by the provider.
    pub max_tokens: Option<u32>,
    /// Whether the call is made through the streaming path.
    pub stream: Option<bool>,
}

impl ChatOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Chat request handed to a provider.
///
/// By the time a provider sees the request, the orchestrator has already resolved the
/// model and merged the configured defaults into `options`.
///
/// # Examples
///
/// ```
/// # use kotoba_assist::types::{ChatOptions, ChatRequest, Message};
/// let request = ChatRequest {
///     model: "gpt-4o-mini".into(),
///     messages: vec![Message::system("You are concise."), Message::user("Explain enums")],
///     options: ChatOptions { temperature: Some(0.3), ..Default::default() },
/// };
/// assert_eq!(request.messages.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier the provider should target.
    pub model: String,
    /// Ordered list of messages to send.
    pub messages: Vec<Message>,
    /// Effective sampling options for this call.
    #[serde(default)]
    pub options: ChatOptions,
}

/// Complete chat response.
///
/// Providers fill `content`, `usage`, `model` and `finish_reason`; the `provider` tag
/// is attached by [`crate::client::LLMClient`] after the call returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Text produced by the model.
    pub content: String,
    /// Token usage accounting.
    pub usage: Option<TokenUsage>,
    /// Effective model identifier.
    pub model: Option<String>,
    /// Why the response stopped.
    pub finish_reason: Option<FinishReason>,
    /// Registered provider identifier, e.g. `openai`.
    pub provider: Option<String>,
}

/// Incremental piece of a streamed response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Text fragment appended to the response.
    pub content: String,
    /// Indicates whether this is the terminal chunk.
    pub done: bool,
}

impl ChatChunk {
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
        }
    }

    pub fn done(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: true,
        }
    }
}

/// Token usage metrics collected from the provider.
///
/// # Examples
///
/// ```
/// # use kotoba_assist::types::TokenUsage;
/// let usage = TokenUsage { prompt_tokens: Some(12), completion_tokens: Some(3), total_tokens: Some(15) };
/// assert_eq!(usage.total_tokens, Some(15));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    /// Total tokens across prompt and completion.
    pub total_tokens: Option<u64>,
}

/// Why a chat response stopped generating content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Other(String),
}

/// Capability descriptor advertised by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Whether the provider can stream incremental output.
    pub supports_stream: bool,
}
