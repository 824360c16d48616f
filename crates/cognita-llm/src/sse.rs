//! Server-sent events -> [`CompletionStream`] adapter.

use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Response;

use crate::error::LlmError;
use crate::types::{CompletionStream, StreamChunk};

/// What an SSE data handler wants done with one event.
#[derive(Debug)]
pub enum SseAction {
    Emit(Vec<StreamChunk>),
    Skip,
    Done,
}

/// Convert an SSE HTTP [`Response`] into a [`CompletionStream`].
///
/// `handler` sees each event's data payload. The stream ends at the first
/// `SseAction::Done` or when the body ends, whichever is first.
pub fn completion_stream_from_sse<H>(response: Response, mut handler: H) -> CompletionStream
where
    H: FnMut(&str) -> Result<SseAction, LlmError> + Send + 'static,
{
    let stream = response
        .bytes_stream()
        .eventsource()
        .map(move |event| {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
            handler(event.data.as_str())
        })
        .take_while(|result| futures::future::ready(!matches!(result, Ok(SseAction::Done))))
        .flat_map(|result| {
            let items: Vec<Result<StreamChunk, LlmError>> = match result {
                Ok(SseAction::Emit(chunks)) => chunks.into_iter().map(Ok).collect(),
                Ok(SseAction::Skip) | Ok(SseAction::Done) => Vec::new(),
                Err(e) => vec![Err(e)],
            };
            futures::stream::iter(items)
        });

    Box::pin(stream)
}
