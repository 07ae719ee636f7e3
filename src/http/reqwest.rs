use std::collections::HashMap;
use std::error::Error as StdError;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Method};

use crate::error::{LLMError, NetworkErrorCode};

use super::{
    DynHttpTransport, HttpBodyStream, HttpMethod, HttpRequest, HttpResponse, HttpStreamResponse,
    HttpTransport,
};

/// Default [`HttpTransport`] backed by `reqwest`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps a caller-configured `reqwest::Client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a transport with reqwest's default settings.
    pub fn default_client() -> Result<Self, LLMError> {
        Client::builder()
            .build()
            .map(Self::new)
            .map_err(|err| LLMError::transport(format!("failed to create reqwest client: {err}")))
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Post => Method::POST,
        }
    }

    fn build_request(&self, mut request: HttpRequest) -> Result<reqwest::RequestBuilder, LLMError> {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);

        for (name, value) in request.headers.drain() {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| LLMError::transport(format!("invalid header name: {err}")))?;
            let header_value = reqwest::header::HeaderValue::from_str(&value).map_err(|err| {
                LLMError::transport(format!("invalid header value for {header_name}: {err}"))
            })?;
            builder = builder.header(header_name, header_value);
        }

        if let Some(body) = request.body.take() {
            builder = builder.body(body);
        }

        Ok(builder)
    }

    fn headers_to_map(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

/// Converts a reqwest failure into [`LLMError::Transport`], classifying the
/// network code from the error and its source chain.
fn map_reqwest_error(err: reqwest::Error) -> LLMError {
    let code = classify_network_error(&err);
    LLMError::Transport {
        message: err.to_string(),
        code,
    }
}

fn classify_network_error(err: &reqwest::Error) -> Option<NetworkErrorCode> {
    if err.is_timeout() {
        return Some(NetworkErrorCode::TimedOut);
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                    return Some(NetworkErrorCode::ConnectionReset);
                }
                io::ErrorKind::TimedOut => return Some(NetworkErrorCode::TimedOut),
                _ => {}
            }
        }
        if looks_like_dns_failure(&cause.to_string()) {
            return Some(NetworkErrorCode::NameNotResolved);
        }
        source = cause.source();
    }
    None
}

/// hyper-util reports resolver failures as plain text.
fn looks_like_dns_failure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("dns error")
        || lower.contains("failed to lookup address")
        || lower.contains("name or service not known")
        || lower.contains("no such host")
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let response = self
            .build_request(request)?
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = Self::headers_to_map(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(map_reqwest_error)?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        let response = self
            .build_request(request)?
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let headers = Self::headers_to_map(response.headers());
        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(map_reqwest_error)
        });
        let body: HttpBodyStream = Box::pin(stream);

        Ok(HttpStreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// Builds the default reqwest transport as a shareable handle.
pub fn default_dyn_transport() -> Result<DynHttpTransport, LLMError> {
    Ok(Arc::new(ReqwestTransport::default_client()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dns_failures_are_recognized_from_text() {
        assert!(looks_like_dns_failure(
            "dns error: failed to lookup address information: Name or service not known"
        ));
        assert!(!looks_like_dns_failure("connection refused"));
    }

    #[tokio::test]
    #[ignore = "depends on the host resolver"]
    async fn unresolvable_host_is_tagged_as_not_found() {
        let transport = ReqwestTransport::default_client().expect("transport");
        let request = HttpRequest::post_json("http://nonexistent.invalid/v1", b"{}".to_vec());
        match transport.send(request).await {
            Err(LLMError::Transport { code, .. }) => {
                assert_eq!(code, Some(NetworkErrorCode::NameNotResolved));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
