use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, post_json_stream_with_headers, post_json_with_headers};
use crate::provider::{ChatStream, LLMProvider};
use crate::stream::collect_body_text;
use crate::types::{CapabilityDescriptor, ChatRequest, ChatResponse};

use super::error::parse_gemini_error;
use super::request::build_gemini_body;
use super::response::map_response;
use super::stream::create_stream;
use super::types::GeminiGenerateContentResponse;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const PROVIDER_NAME: &str = "gemini";

/// Google Gemini GenerateContent provider implementation.
pub struct GoogleGeminiProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    default_model: Option<String>,
}

impl GoogleGeminiProvider {
    /// Creates a provider that targets the default Google Generative Language endpoint.
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            default_model: None,
        }
    }

    /// Overrides the base URL, making it easier to point at proxies or compatibility layers.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets a default model such as `gemini-1.5-flash` when the request omits one.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let model_path = normalize_model(model);
        if base.ends_with("/v1beta") {
            format!("{base}/{model_path}:{method}")
        } else {
            format!("{base}/v1beta/{model_path}:{method}")
        }
    }

    pub(crate) fn endpoint(&self, model: &str) -> String {
        self.model_url(model, "generateContent")
    }

    pub(crate) fn stream_endpoint(&self, model: &str) -> String {
        self.model_url(model, "streamGenerateContent?alt=sse")
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            ("x-goog-api-key".to_string(), self.api_key.clone()),
            ("Accept".to_string(), "application/json".to_string()),
        ])
    }

    fn resolve_model<'a>(&'a self, request: &'a ChatRequest) -> Result<&'a str, LLMError> {
        Some(request.model.as_str())
            .filter(|model| !model.is_empty())
            .or(self.default_model.as_deref())
            .ok_or_else(|| LLMError::Validation {
                message: "model is required for Google Gemini".to_string(),
            })
    }
}

fn normalize_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[async_trait]
impl LLMProvider for GoogleGeminiProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LLMError> {
        let model = self.resolve_model(&request)?;
        let body = build_gemini_body(&request)?;
        let response = post_json_with_headers(
            self.transport.as_ref(),
            self.endpoint(model),
            self.build_headers(),
            &body,
        )
        .await?;

        if !response.is_success() {
            let text = String::from_utf8_lossy(&response.body);
            return Err(parse_gemini_error(
                PROVIDER_NAME,
                response.status,
                &response.headers,
                &text,
            ));
        }
        let text = response.into_string()?;
        let parsed: GeminiGenerateContentResponse = serde_json::from_str(&text).map_err(|err| {
            LLMError::provider(PROVIDER_NAME, format!("failed to parse Gemini response: {err}"))
        })?;
        Ok(map_response(parsed))
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, LLMError> {
        let model = self.resolve_model(&request)?;
        let body = build_gemini_body(&request)?;
        let response = post_json_stream_with_headers(
            self.transport.as_ref(),
            self.stream_endpoint(model),
            self.build_headers(),
            &body,
        )
        .await?;
        if !(200..300).contains(&response.status) {
            let text = collect_body_text(response.body, PROVIDER_NAME).await?;
            return Err(parse_gemini_error(
                PROVIDER_NAME,
                response.status,
                &response.headers,
                &text,
            ));
        }
        Ok(create_stream(response.body, PROVIDER_NAME))
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_stream: true,
        }
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures_util::{StreamExt, stream};
    use serde_json::Value;

    use super::*;
    use crate::http::{HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};
    use crate::types::{ChatOptions, Message};

    struct ScriptedTransport {
        status: u16,
        headers: HashMap<String, String>,
        body: &'static str,
        seen: Mutex<Option<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                headers: HashMap::new(),
                body,
                seen: Mutex::new(None),
            })
        }

        fn sent(&self) -> HttpRequest {
            self.seen.lock().unwrap().clone().expect("request")
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
            *self.seen.lock().unwrap() = Some(request);
            Ok(HttpResponse {
                status: self.status,
                headers: self.headers.clone(),
                body: self.body.as_bytes().to_vec(),
            })
        }

        async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
            *self.seen.lock().unwrap() = Some(request);
            let bytes = self.body.as_bytes().to_vec();
            Ok(HttpStreamResponse {
                status: self.status,
                headers: self.headers.clone(),
                body: Box::pin(stream::iter(vec![Ok(bytes)])),
            })
        }
    }

    fn request(model: &str) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: vec![Message::system("Be brief."), Message::user("Hello")],
            options: ChatOptions::default().with_max_tokens(20),
        }
    }

    #[tokio::test]
    async fn chat_hits_generate_content_with_api_key_header() {
        let transport = ScriptedTransport::new(
            200,
            r#"{"candidates":[{"content":{"parts":[{"text":"Hi!"}]},"finishReason":"STOP"}]}"#,
        );
        let provider = GoogleGeminiProvider::new(transport.clone(), "g-key");

        let response = provider
            .chat(request("gemini-1.5-flash"))
            .await
            .expect("response");
        assert_eq!(response.content, "Hi!");

        let sent = transport.sent();
        assert_eq!(
            sent.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(
            sent.headers.get("x-goog-api-key").map(String::as_str),
            Some("g-key")
        );
        let body: Value = serde_json::from_slice(&sent.body.expect("body")).expect("json");
        assert_eq!(body["system_instruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 20);
    }

    #[tokio::test]
    async fn stream_uses_sse_endpoint_and_default_model() {
        let transport = ScriptedTransport::new(
            200,
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ok\"}]},\"finishReason\":\"STOP\"}]}\n\n",
        );
        let provider = GoogleGeminiProvider::new(transport.clone(), "g-key")
            .with_base_url("http://localhost:9000/v1beta/")
            .with_default_model("models/gemini-pro");

        let chunks: Vec<_> = provider
            .stream_chat(request(""))
            .await
            .expect("stream")
            .collect()
            .await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].as_ref().expect("chunk").done);
        assert_eq!(
            transport.sent().url,
            "http://localhost:9000/v1beta/models/gemini-pro:streamGenerateContent?alt=sse"
        );
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after() {
        let transport = Arc::new(ScriptedTransport {
            status: 429,
            headers: HashMap::from([("Retry-After".to_string(), "5".to_string())]),
            body: r#"{"error":{"code":429,"message":"slow","status":"RESOURCE_EXHAUSTED"}}"#,
            seen: Mutex::new(None),
        });
        let provider = GoogleGeminiProvider::new(transport, "g-key");
        match provider.chat(request("gemini-1.5-flash")).await {
            Err(LLMError::RateLimit { retry_after, .. }) => {
                assert_eq!(retry_after, Some(std::time::Duration::from_secs(5)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
