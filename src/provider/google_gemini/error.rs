use std::collections::HashMap;

use serde::Deserialize;

use crate::error::LLMError;
use crate::retry::retry_after_from_headers;

/// Parses `{"error": {"code", "message", "status"}}` bodies.
pub(crate) fn parse_gemini_error(
    provider: &'static str,
    status: u16,
    headers: &HashMap<String, String>,
    body: &str,
) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        status: Option<String>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .map(|error| {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            match error.status.filter(|text| !text.is_empty()) {
                Some(rpc_status) => format!("{message} ({rpc_status})"),
                None => message,
            }
        })
        .unwrap_or_else(|| format!("status {status}: {body}"));

    LLMError::from_status(provider, status, message, retry_after_from_headers(headers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_status_is_appended() {
        let err = parse_gemini_error(
            "gemini",
            400,
            &HashMap::new(),
            r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#,
        );
        match err {
            LLMError::Provider {
                provider,
                status,
                message,
            } => {
                assert_eq!(provider, "gemini");
                assert_eq!(status, Some(400));
                assert_eq!(message, "API key not valid. (INVALID_ARGUMENT)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn resource_exhausted_is_rate_limited() {
        let err = parse_gemini_error(
            "gemini",
            429,
            &HashMap::new(),
            r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(matches!(err, LLMError::RateLimit { retry_after: None, .. }));
    }

    #[test]
    fn plain_text_body_is_kept() {
        let err = parse_gemini_error("gemini", 500, &HashMap::new(), "internal");
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("status 500: internal"));
    }
}
