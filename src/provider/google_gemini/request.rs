use crate::error::LLMError;
use crate::types::{ChatRequest, Role};

use super::types::{
    GeminiContentOut, GeminiGenerationConfig, GeminiOwnedTextPart, GeminiRequestBody,
    GeminiSystemInstruction, GeminiTextPart,
};

/// Builds a GenerateContent body.
///
/// System messages become `system_instruction` (joined by blank lines) and the
/// assistant role is renamed to `model`.
pub(crate) fn build_gemini_body(request: &ChatRequest) -> Result<GeminiRequestBody<'_>, LLMError> {
    let mut system = Vec::new();
    let mut contents = Vec::new();
    for message in &request.messages {
        let role = match message.role {
            Role::System => {
                system.push(message.content.as_str());
                continue;
            }
            Role::User => "user",
            Role::Assistant => "model",
        };
        contents.push(GeminiContentOut {
            role,
            parts: vec![GeminiTextPart {
                text: &message.content,
            }],
        });
    }
    if contents.is_empty() {
        return Err(LLMError::Validation {
            message: "Gemini requires at least one user or assistant message".to_string(),
        });
    }

    let system_instruction = (!system.is_empty()).then(|| GeminiSystemInstruction {
        parts: vec![GeminiOwnedTextPart {
            text: system.join("\n\n"),
        }],
    });
    let options = &request.options;
    let generation_config = (options.temperature.is_some() || options.max_tokens.is_some())
        .then(|| GeminiGenerationConfig {
            temperature: options.temperature,
            max_output_tokens: options.max_tokens,
        });

    Ok(GeminiRequestBody {
        contents,
        system_instruction,
        generation_config,
    })
}
