use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::error::LlmError;
use crate::types::{Completion, CompletionRequest, CompletionStream, StreamChunk};

/// A chat-completion service.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier sent with every request.
    fn model_id(&self) -> &str;

    /// Stream a completion token by token.
    async fn complete_stream(&self, request: &CompletionRequest)
    -> Result<CompletionStream, LlmError>;

    /// Run a completion to the end.
    ///
    /// The default drains [`complete_stream`](Self::complete_stream);
    /// backends with a cheaper non-streaming call override it.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let stream = self.complete_stream(request).await?;
        collect_stream(stream).await
    }
}

/// Drain a completion stream into a [`Completion`], stopping at the first
/// error.
///
/// Callers that relay tokens as they arrive wrap the stream first (for
/// example with [`StreamExt::then`]) and drain the wrapper here.
pub async fn collect_stream<S>(mut stream: S) -> Result<Completion, LlmError>
where
    S: Stream<Item = Result<StreamChunk, LlmError>> + Unpin,
{
    let mut completion = Completion::default();
    while let Some(chunk) = stream.next().await {
        match chunk? {
            StreamChunk::Token(text) => completion.text.push_str(&text),
            StreamChunk::Usage(tokens) => completion.tokens = tokens,
        }
    }
    Ok(completion)
}
