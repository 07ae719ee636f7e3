//! Server-sent-event decoding shared by the streaming provider adapters.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::{StreamExt, stream};

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::ChatStream;
use crate::types::ChatChunk;

/// Standardized SSE event yielded by [`SseDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Raw `data:` payload emitted by the provider.
    Data(String),
    /// Terminal marker reported via `[DONE]`.
    Done,
}

/// Turns a raw HTTP body into a sequence of [`SseEvent`] values.
///
/// Multi-line `data:` fields are joined with `\n`, CRLF line endings are tolerated and
/// other SSE fields (`event:`, `id:`, comments) are ignored. The decoder stops after the
/// first `[DONE]` marker.
pub struct SseDecoder {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    data_lines: Vec<Vec<u8>>,
    pending: VecDeque<Result<SseEvent, LLMError>>,
    provider: &'static str,
    body_finished: bool,
    done_received: bool,
}

impl SseDecoder {
    pub fn new(body: HttpBodyStream, provider: &'static str) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            data_lines: Vec::new(),
            pending: VecDeque::new(),
            provider,
            body_finished: false,
            done_received: false,
        }
    }

    fn push_line(&mut self, line: Vec<u8>) -> Result<(), LLMError> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(rest) = line.strip_prefix(b"data:") {
            let rest = rest.strip_prefix(b" ").unwrap_or(rest);
            self.data_lines.push(rest.to_vec());
        }
        Ok(())
    }

    fn dispatch(&mut self) -> Result<(), LLMError> {
        if self.data_lines.is_empty() {
            return Ok(());
        }
        let joined = self.data_lines.drain(..).collect::<Vec<_>>().join(&b'\n');
        let data = String::from_utf8(joined).map_err(|err| {
            LLMError::provider(self.provider, format!("invalid UTF-8 in stream chunk: {err}"))
        })?;

        if data.trim() == "[DONE]" {
            if !self.done_received {
                self.done_received = true;
                self.pending.push_back(Ok(SseEvent::Done));
            }
        } else if !data.is_empty() && !self.done_received {
            self.pending.push_back(Ok(SseEvent::Data(data)));
        }
        Ok(())
    }

    fn next_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    fn drain_buffer(&mut self) -> Result<(), LLMError> {
        while let Some(line) = self.next_line() {
            self.push_line(line)?;
        }
        Ok(())
    }

    /// Flushes whatever the body left behind once it has ended.
    fn finish(&mut self) -> Result<(), LLMError> {
        if !self.buffer.is_empty() {
            let tail = std::mem::take(&mut self.buffer);
            self.push_line(tail)?;
        }
        self.dispatch()
    }
}

impl Stream for SseDecoder {
    type Item = Result<SseEvent, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }
            if this.done_received || this.body_finished {
                return Poll::Ready(None);
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                    if let Err(err) = this.drain_buffer() {
                        return Poll::Ready(Some(Err(err)));
                    }
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => {
                    this.body_finished = true;
                    if let Err(err) = this.finish() {
                        return Poll::Ready(Some(Err(err)));
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Converts an SSE body into a [`ChatStream`] using a per-payload converter.
///
/// `convert` returns `Ok(None)` for payloads that carry nothing worth emitting. The
/// stream ends after the first `done` chunk, the `[DONE]` marker, or the first error.
pub(crate) fn chunk_stream<F>(body: HttpBodyStream, provider: &'static str, convert: F) -> ChatStream
where
    F: FnMut(&str) -> Result<Option<ChatChunk>, LLMError> + Send + 'static,
{
    let decoder = SseDecoder::new(body, provider);
    Box::pin(stream::unfold(
        Some((decoder, convert)),
        |state| async move {
            let (mut decoder, mut convert) = state?;
            loop {
                let item = match decoder.next().await? {
                    Ok(SseEvent::Data(data)) => match convert(&data) {
                        Ok(Some(chunk)) => Ok(chunk),
                        Ok(None) => continue,
                        Err(err) => Err(err),
                    },
                    Ok(SseEvent::Done) => Ok(ChatChunk::done("")),
                    Err(err) => Err(err),
                };
                let more = matches!(&item, Ok(chunk) if !chunk.done);
                return Some((item, more.then_some((decoder, convert))));
            }
        },
    ))
}

/// Reads an entire (error) body into a string.
pub(crate) async fn collect_body_text(
    mut body: HttpBodyStream,
    provider: &'static str,
) -> Result<String, LLMError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    String::from_utf8(bytes).map_err(|err| {
        LLMError::provider(provider, format!("failed to decode stream error body: {err}"))
    })
}
