use crate::error::LLMError;
use crate::types::ChatRequest;

use super::types::{OpenAiChatBody, OpenAiMessage};

pub(crate) fn build_openai_body<'a>(
    request: &'a ChatRequest,
    model: &'a str,
    stream: bool,
) -> Result<OpenAiChatBody<'a>, LLMError> {
    if request.messages.is_empty() {
        return Err(LLMError::Validation {
            message: "at least one message is required".to_string(),
        });
    }
    let messages = request
        .messages
        .iter()
        .map(|message| OpenAiMessage {
            role: message.role.as_str(),
            content: &message.content,
        })
        .collect();
    Ok(OpenAiChatBody {
        model,
        messages,
        temperature: request.options.temperature,
        max_tokens: request.options.max_tokens,
        stream,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{ChatOptions, Message};

    #[test]
    fn body_carries_roles_and_sampling_options() {
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![Message::system("be brief"), Message::user("hello")],
            options: ChatOptions {
                temperature: Some(0.25),
                max_tokens: Some(64),
                stream: None,
            },
        };
        let body = build_openai_body(&request, &request.model, true).expect("body");
        assert_eq!(
            serde_json::to_value(&body).expect("json"),
            json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"}
                ],
                "temperature": 0.25,
                "max_tokens": 64,
                "stream": true
            })
        );
    }

    #[test]
    fn unset_options_are_omitted() {
        let request = ChatRequest {
            model: "m".into(),
            messages: vec![Message::user("hi")],
            options: ChatOptions::default(),
        };
        let value = serde_json::to_value(build_openai_body(&request, "m", false).expect("body"))
            .expect("json");
        assert!(value.get("temperature").is_none());
        assert!(value.get("max_tokens").is_none());
        assert_eq!(value["stream"], json!(false));
    }

    #[test]
    fn empty_conversation_is_rejected() {
        let request = ChatRequest {
            model: "m".into(),
            messages: Vec::new(),
            options: ChatOptions::default(),
        };
        assert!(matches!(
            build_openai_body(&request, "m", false),
            Err(LLMError::Validation { .. })
        ));
    }
}
