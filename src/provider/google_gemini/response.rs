use crate::types::{ChatResponse, FinishReason, TokenUsage};

use super::types::{GeminiGenerateContentResponse, GeminiUsageMetadata};

pub(crate) fn map_response(resp: GeminiGenerateContentResponse) -> ChatResponse {
    let first = resp.candidates.first();
    ChatResponse {
        content: first.map(|candidate| candidate.text()).unwrap_or_default(),
        usage: resp.usage_metadata.map(convert_usage),
        model: resp.model_version,
        finish_reason: first
            .and_then(|candidate| candidate.finish_reason.as_deref())
            .map(convert_finish_reason),
        provider: None,
    }
}

pub(crate) fn convert_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        other => FinishReason::Other(other.to_string()),
    }
}

fn convert_usage(usage: GeminiUsageMetadata) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_token_count,
        completion_tokens: usage.candidates_token_count,
        total_tokens: usage.total_token_count,
    }
}
