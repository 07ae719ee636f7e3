use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::ChatStream;
use crate::stream::chunk_stream;
use crate::types::ChatChunk;

use super::types::OpenAiStreamChunk;

pub(crate) fn create_stream(body: HttpBodyStream, provider: &'static str) -> ChatStream {
    chunk_stream(body, provider, move |data| convert_stream_chunk(data, provider))
}

/// Role-only and usage-only deltas produce no chunk.
fn convert_stream_chunk(data: &str, provider: &'static str) -> Result<Option<ChatChunk>, LLMError> {
    let chunk: OpenAiStreamChunk = serde_json::from_str(data)
        .map_err(|err| LLMError::provider(provider, format!("failed to parse stream chunk: {err}")))?;
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };
    let content = choice
        .delta
        .and_then(|delta| delta.content)
        .unwrap_or_default();
    Ok(match (content.is_empty(), choice.finish_reason.is_some()) {
        (_, true) => Some(ChatChunk::done(content)),
        (false, false) => Some(ChatChunk::delta(content)),
        (true, false) => None,
    })
}

#[cfg(test)]
mod tests {
    use futures_util::{StreamExt, stream};

    use super::*;

    fn body(raw: &'static str) -> HttpBodyStream {
        Box::pin(stream::iter(vec![Ok(raw.as_bytes().to_vec())]))
    }

    #[tokio::test]
    async fn deltas_end_at_finish_reason() {
        let raw = concat!(
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let chunks: Vec<ChatChunk> = create_stream(body(raw), "openai")
            .map(|item| item.expect("chunk"))
            .collect()
            .await;
        assert_eq!(
            chunks,
            vec![
                ChatChunk::delta("Hel"),
                ChatChunk::delta("lo"),
                ChatChunk::done("")
            ]
        );
    }

    #[tokio::test]
    async fn done_marker_terminates_without_finish_reason() {
        let raw = concat!(
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"x\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let chunks: Vec<ChatChunk> = create_stream(body(raw), "deepseek")
            .map(|item| item.expect("chunk"))
            .collect()
            .await;
        assert_eq!(chunks, vec![ChatChunk::delta("x"), ChatChunk::done("")]);
    }

    #[tokio::test]
    async fn malformed_chunk_surfaces_provider_error() {
        let mut stream = create_stream(body("data: {not json}\n\n"), "openai");
        let err = stream.next().await.expect("item").unwrap_err();
        assert_eq!(err.provider_name(), Some("openai"));
        assert!(stream.next().await.is_none());
    }
}
