use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, post_json_stream_with_headers, post_json_with_headers};
use crate::provider::{ChatStream, LLMProvider};
use crate::stream::collect_body_text;
use crate::types::{CapabilityDescriptor, ChatRequest, ChatResponse};

use super::error::parse_openai_error;
use super::request::build_openai_body;
use super::response::map_response;
use super::stream::create_stream;
use super::types::OpenAiChatResponse;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI Chat Completions provider.
///
/// Any vendor exposing the same `/v1/chat/completions` contract can be reached by
/// overriding the base URL and the reported name.
pub struct OpenAiChatProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    default_model: Option<String>,
    name: &'static str,
}

impl OpenAiChatProvider {
    /// Creates a provider targeting the official endpoint.
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            default_model: None,
            name: "openai",
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Model used when a request leaves `model` empty.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Identifier reported by [`LLMProvider::name`], e.g. `deepseek`.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.api_key),
            ),
            ("Accept".to_string(), "application/json".to_string()),
        ])
    }

    fn resolve_model<'a>(&'a self, request: &'a ChatRequest) -> Result<&'a str, LLMError> {
        Some(request.model.as_str())
            .filter(|model| !model.is_empty())
            .or(self.default_model.as_deref())
            .ok_or_else(|| LLMError::Validation {
                message: format!("model is required for {}", self.name),
            })
    }
}

#[async_trait]
impl LLMProvider for OpenAiChatProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LLMError> {
        let model = self.resolve_model(&request)?;
        let body = build_openai_body(&request, model, false)?;
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(),
            &body,
        )
        .await?;

        let status = response.status;
        if !response.is_success() {
            let headers = response.headers.clone();
            let text = String::from_utf8_lossy(&response.body).into_owned();
            return Err(parse_openai_error(self.name, status, &headers, &text));
        }
        let text = response.into_string()?;
        let parsed: OpenAiChatResponse = serde_json::from_str(&text).map_err(|err| {
            LLMError::provider(self.name, format!("failed to parse chat completion: {err}"))
        })?;
        Ok(map_response(parsed))
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, LLMError> {
        let model = self.resolve_model(&request)?;
        let body = build_openai_body(&request, model, true)?;
        let response = post_json_stream_with_headers(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(),
            &body,
        )
        .await?;
        if !(200..300).contains(&response.status) {
            let text = collect_body_text(response.body, self.name).await?;
            return Err(parse_openai_error(
                self.name,
                response.status,
                &response.headers,
                &text,
            ));
        }
        Ok(create_stream(response.body, self.name))
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_stream: true,
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
