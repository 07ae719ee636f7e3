use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use kotoba_assist::http::{HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};
use kotoba_assist::types::{ChatOptions, Message};
use kotoba_assist::{ClientConfig, LLMClient, LLMError, NetworkErrorCode};

/// Serves queued responses in order and records each request URL.
struct QueueTransport {
    replies: Mutex<VecDeque<Result<(u16, &'static str), LLMError>>>,
    urls: Mutex<Vec<String>>,
}

impl QueueTransport {
    fn with(replies: Vec<Result<(u16, &'static str), LLMError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            urls: Mutex::new(Vec::new()),
        })
    }

    fn next(&self, request: &HttpRequest) -> Result<(u16, &'static str), LLMError> {
        self.urls.lock().unwrap().push(request.url.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::transport("no scripted reply")))
    }
}

#[async_trait]
impl HttpTransport for QueueTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let (status, body) = self.next(&request)?;
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: body.as_bytes().to_vec(),
        })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        let (status, body) = self.next(&request)?;
        Ok(HttpStreamResponse {
            status,
            headers: HashMap::new(),
            body: Box::pin(stream::iter(vec![Ok(body.as_bytes().to_vec())])),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn openai_server_errors_and_resets_are_retried() {
    let transport = QueueTransport::with(vec![
        Ok((500, r#"{"error":{"message":"internal"}}"#)),
        Err(LLMError::network(NetworkErrorCode::ConnectionReset, "reset")),
        Ok((
            200,
            r#"{"model":"gpt-4o-mini","choices":[{"message":{"content":" done "},"finish_reason":"stop"}]}"#,
        )),
    ]);
    let config = ClientConfig::new("openai", "sk-test").with_retry_delay(Duration::from_millis(10));
    let client = LLMClient::with_transport(config, transport.clone()).expect("client");

    let summary = client
        .summarize("text", &Default::default())
        .await
        .expect("summary");
    assert_eq!(summary, "done");
    assert_eq!(transport.urls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn groq_uses_its_default_base_url() {
    let transport = QueueTransport::with(vec![Ok((
        200,
        r#"{"choices":[{"message":{"content":"hi"}}]}"#,
    ))]);
    let client = LLMClient::with_transport(ClientConfig::new("groq", "gsk"), transport.clone())
        .expect("client");

    let response = client
        .chat(vec![Message::user("hi")], ChatOptions::default())
        .await
        .expect("response");
    assert_eq!(response.provider.as_deref(), Some("groq"));
    assert_eq!(response.model.as_deref(), Some("llama-3.1-8b-instant"));
    assert_eq!(
        transport.urls.lock().unwrap()[0],
        "https://api.groq.com/openai/v1/chat/completions"
    );
}

#[tokio::test]
async fn gemini_bad_request_fails_fast() {
    let transport = QueueTransport::with(vec![Ok((
        400,
        r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#,
    ))]);
    let client = LLMClient::with_transport(ClientConfig::new("google", "bad"), transport.clone())
        .expect("client");

    let err = client
        .detect_language("hola")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.provider_name(), Some("gemini"));
    assert_eq!(transport.urls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn gemini_stream_through_client() {
    let transport = QueueTransport::with(vec![Ok((
        200,
        concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Ho\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"la\"}]},\"finishReason\":\"STOP\"}]}\n\n",
        ),
    ))]);
    let client = LLMClient::with_transport(
        ClientConfig::new("gemini", "key").with_model("gemini-2.0-flash"),
        transport.clone(),
    )
    .expect("client");

    let text: String = client
        .chat_stream(vec![Message::user("hi")], ChatOptions::default())
        .await
        .expect("stream")
        .map(|chunk| chunk.expect("chunk").content)
        .collect::<Vec<_>>()
        .await
        .concat();
    assert_eq!(text, "Hola");
    assert!(transport.urls.lock().unwrap()[0]
        .ends_with("/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse"));
}
