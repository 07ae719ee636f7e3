use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LLMError;
use crate::retry::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, RetryPolicy};
use crate::timeout::DEFAULT_TIMEOUT;

/// Temperature used when neither the configuration nor the call sets one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Known provider identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions.
    OpenAi,
    /// Google Gemini generateContent.
    Gemini,
    /// DeepSeek, served through the OpenAI-compatible adapter.
    DeepSeek,
    /// Groq, served through the OpenAI-compatible adapter.
    Groq,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [Self::OpenAi, Self::Gemini, Self::DeepSeek, Self::Groq];

    /// Registered identifier, as attached to responses and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::DeepSeek => "deepseek",
            Self::Groq => "groq",
        }
    }

    /// Model used when the configuration does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Gemini => "gemini-1.5-flash",
            Self::DeepSeek => "deepseek-chat",
            Self::Groq => "llama-3.1-8b-instant",
        }
    }

    /// Base URL for OpenAI-compatible vendors; `None` keeps the adapter default.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Self::DeepSeek => Some("https://api.deepseek.com"),
            Self::Groq => Some("https://api.groq.com/openai"),
            Self::OpenAi | Self::Gemini => None,
        }
    }

    /// Vendor-specific environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::DeepSeek => "DEEPSEEK_API_KEY",
            Self::Groq => "GROQ_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LLMError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            "deepseek" => Ok(Self::DeepSeek),
            "groq" => Ok(Self::Groq),
            "" => Err(LLMError::config("provider", "a provider identifier is required")),
            other => Err(LLMError::config(
                "provider",
                format!("unsupported provider `{other}`"),
            )),
        }
    }
}

/// Client configuration.
///
/// Only `provider` and `api_key` are required; everything else has a default. The
/// struct deserializes with `#[serde(default)]` so partial documents are accepted,
/// and durations are expressed in milliseconds.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Provider identifier such as `openai` or `gemini`.
    pub provider: String,
    pub api_key: String,
    /// Model name; filled with the provider default at client construction.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Overrides the provider endpoint, e.g. for proxies.
    pub base_url: Option<String>,
    /// Deadline for a single attempt.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    pub max_retries: u32,
    /// Delay before the first retry.
    #[serde(with = "duration_ms")]
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            api_key: String::new(),
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration with defaults for everything but the identity.
    pub fn new(provider: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }

    /// Checks the required fields and fills in the provider's default model.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] when the API key is empty or the provider
    /// identifier is missing or unknown.
    pub fn validate(&mut self) -> Result<ProviderKind, LLMError> {
        if self.api_key.trim().is_empty() {
            return Err(LLMError::config("api_key", "an API key is required"));
        }
        let kind: ProviderKind = self.provider.parse()?;
        if self.model.as_deref().is_none_or(|model| model.trim().is_empty()) {
            self.model = Some(kind.default_model().to_string());
        }
        Ok(kind)
    }

    /// Loads a configuration from the process environment.
    ///
    /// See [`ClientConfig::from_lookup`] for the variables read. Missing values are
    /// not an error here; [`crate::client::LLMClient::new`] rejects them.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads a configuration from any key/value source.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `LLM_PROVIDER` | `provider` (defaults to `openai`) |
    /// | `LLM_API_KEY` | `api_key`, falling back to e.g. `OPENAI_API_KEY` |
    /// | `LLM_MODEL` | `model` |
    /// | `LLM_BASE_URL` | `base_url` |
    /// | `LLM_TEMPERATURE` | `temperature` |
    /// | `LLM_MAX_TOKENS` | `max_tokens` |
    /// | `LLM_TIMEOUT_MS` | `timeout` |
    /// | `LLM_MAX_RETRIES` | `max_retries` |
    /// | `LLM_RETRY_DELAY_MS` | `retry_delay` |
    ///
    /// Malformed numbers are logged and replaced by their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::collections::HashMap;
    /// # use kotoba_assist::config::ClientConfig;
    /// let vars = HashMap::from([("LLM_PROVIDER", "gemini"), ("GEMINI_API_KEY", "k")]);
    /// let config = ClientConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
    /// assert_eq!(config.provider, "gemini");
    /// assert_eq!(config.api_key, "k");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let provider = get("LLM_PROVIDER").unwrap_or_else(|| ProviderKind::OpenAi.to_string());
        let api_key = get("LLM_API_KEY")
            .or_else(|| {
                provider
                    .parse::<ProviderKind>()
                    .ok()
                    .and_then(|kind| get(kind.api_key_env()))
            })
            .unwrap_or_default();

        let timeout_ms = parse_or(&get, "LLM_TIMEOUT_MS", defaults.timeout.as_millis() as u64);
        let retry_delay_ms = parse_or(
            &get,
            "LLM_RETRY_DELAY_MS",
            defaults.retry_delay.as_millis() as u64,
        );

        Self {
            provider,
            api_key,
            model: get("LLM_MODEL"),
            temperature: parse_or(&get, "LLM_TEMPERATURE", defaults.temperature),
            max_tokens: get("LLM_MAX_TOKENS").and_then(|raw| match raw.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(key = "LLM_MAX_TOKENS", value = %raw, "ignoring malformed value");
                    None
                }
            }),
            base_url: get("LLM_BASE_URL"),
            timeout: Duration::from_millis(timeout_ms),
            max_retries: parse_or(&get, "LLM_MAX_RETRIES", defaults.max_retries),
            retry_delay: Duration::from_millis(retry_delay_ms),
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring malformed value, using default");
            default
        }),
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
