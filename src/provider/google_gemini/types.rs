use serde::{Deserialize, Serialize};

/// GenerateContent request body.
#[derive(Debug, Serialize)]
pub(crate) struct GeminiRequestBody<'a> {
    pub(crate) contents: Vec<GeminiContentOut<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub(crate) generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiContentOut<'a> {
    pub(crate) role: &'static str,
    pub(crate) parts: Vec<GeminiTextPart<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiTextPart<'a> {
    pub(crate) text: &'a str,
}

/// System messages are folded into one instruction.
#[derive(Debug, Serialize)]
pub(crate) struct GeminiSystemInstruction {
    pub(crate) parts: Vec<GeminiOwnedTextPart>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiOwnedTextPart {
    pub(crate) text: String,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    pub(crate) max_output_tokens: Option<u32>,
}

/// GenerateContentResponse, shared by full responses and stream chunks.
#[derive(Debug, Deserialize)]
pub(crate) struct GeminiGenerateContentResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<GeminiCandidate>,
    #[serde(default, rename = "usageMetadata")]
    pub(crate) usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default, rename = "modelVersion")]
    pub(crate) model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub(crate) content: Option<GeminiContentIn>,
    #[serde(default, rename = "finishReason")]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiContentIn {
    #[serde(default)]
    pub(crate) parts: Vec<GeminiPartIn>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiPartIn {
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiUsageMetadata {
    #[serde(default, rename = "promptTokenCount")]
    pub(crate) prompt_token_count: Option<u64>,
    #[serde(default, rename = "candidatesTokenCount")]
    pub(crate) candidates_token_count: Option<u64>,
    #[serde(default, rename = "totalTokenCount")]
    pub(crate) total_token_count: Option<u64>,
}

impl GeminiCandidate {
    /// Concatenated text of every part.
    pub(crate) fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}
