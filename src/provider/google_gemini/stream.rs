use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::ChatStream;
use crate::stream::chunk_stream;
use crate::types::ChatChunk;

use super::types::GeminiGenerateContentResponse;

/// Gemini never sends `[DONE]`; a candidate carrying `finishReason` ends the stream.
pub(crate) fn create_stream(body: HttpBodyStream, provider: &'static str) -> ChatStream {
    chunk_stream(body, provider, move |data| convert_stream_chunk(data, provider))
}

fn convert_stream_chunk(data: &str, provider: &'static str) -> Result<Option<ChatChunk>, LLMError> {
    let chunk: GeminiGenerateContentResponse = serde_json::from_str(data)
        .map_err(|err| LLMError::provider(provider, format!("failed to parse stream chunk: {err}")))?;
    let Some(candidate) = chunk.candidates.first() else {
        return Ok(None);
    };
    let text = candidate.text();
    Ok(if candidate.finish_reason.is_some() {
        Some(ChatChunk::done(text))
    } else if text.is_empty() {
        None
    } else {
        Some(ChatChunk::delta(text))
    })
}

#[cfg(test)]
mod tests {
    use futures_util::{StreamExt, stream};

    use super::*;

    #[tokio::test]
    async fn finish_reason_marks_last_chunk() {
        let raw = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hola\"}],\"role\":\"model\"}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" mundo\"}],\"role\":\"model\"},\"finishReason\":\"STOP\"}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ignored\"}]}}]}\r\n\r\n",
        );
        let body: HttpBodyStream = Box::pin(stream::iter(vec![Ok(raw.as_bytes().to_vec())]));
        let chunks: Vec<ChatChunk> = create_stream(body, "gemini")
            .map(|item| item.expect("chunk"))
            .collect()
            .await;
        assert_eq!(
            chunks,
            vec![ChatChunk::delta("Hola"), ChatChunk::done(" mundo")]
        );
    }

    #[tokio::test]
    async fn usage_only_chunk_is_skipped() {
        let raw = "data: {\"usageMetadata\":{\"totalTokenCount\":3}}\n\n";
        let body: HttpBodyStream = Box::pin(stream::iter(vec![Ok(raw.as_bytes().to_vec())]));
        let chunks: Vec<_> = create_stream(body, "gemini").collect().await;
        assert!(chunks.is_empty());
    }
}
