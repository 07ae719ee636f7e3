use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::LLMError;
use crate::retry::retry_after_from_headers;

pub(crate) fn parse_openai_error(
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
        code: Option<Value>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .map(|error| {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            match error.code {
                Some(Value::Null) | None => message,
                Some(code) => format!("{message} ({code})"),
            }
        })
        .unwrap_or_else(|| format!("status {status}: {body}"));

    LLMError::from_status(provider, status, message, retry_after_from_headers(headers))
}
