use crate::types::{ChatResponse, FinishReason, TokenUsage};

use super::types::{OpenAiChatResponse, OpenAiUsage};

/// Maps the first choice onto a [`ChatResponse`]; a missing choice yields empty text.
pub(crate) fn map_response(resp: OpenAiChatResponse) -> ChatResponse {
    let first = resp.choices.into_iter().next();
    let finish_reason = first
        .as_ref()
        .and_then(|choice| choice.finish_reason.as_deref())
        .map(convert_finish_reason);
    let content = first
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default();
    ChatResponse {
        content,
        usage: resp.usage.map(convert_usage),
        model: resp.model,
        finish_reason,
        provider: None,
    }
}

pub(crate) fn convert_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

fn convert_usage(usage: OpenAiUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}
