//! Chat completions through the Bedrock Converse API.
//!
//! The Converse API wants an inference profile ID as `model_id`
//! (e.g. `us.anthropic.claude-sonnet-4-20250514-v1:0`); bare foundation
//! model IDs fail with "on-demand throughput isn't supported".

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::Client;
use aws_sdk_bedrockruntime::primitives::event_stream::EventReceiver;
use aws_sdk_bedrockruntime::types::error::ConverseStreamOutputError;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ContentBlockDelta, ConversationRole, ConverseStreamOutput, InferenceConfiguration,
    Message, SystemContentBlock,
};
use cognita_core::models::token_count::TokenCount;
use tracing::info;

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::types::{ChatRole, Completion, CompletionRequest, CompletionStream, StreamChunk};

pub struct BedrockClient {
    client: Client,
    model_id: String,
}

impl BedrockClient {
    pub fn new(client: Client, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    /// Build a client from the default AWS credential chain.
    pub async fn from_env(region: &str, model_id: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(Client::new(&config), model_id)
    }
}

/// Split a request into Converse system blocks and messages. System-role
/// messages are folded into the system prompt since Converse only accepts
/// user and assistant turns.
fn to_converse(
    request: &CompletionRequest,
) -> Result<(Vec<SystemContentBlock>, Vec<Message>), LlmError> {
    let mut system = Vec::new();
    if !request.system_prompt.is_empty() {
        system.push(SystemContentBlock::Text(request.system_prompt.clone()));
    }

    let mut messages = Vec::with_capacity(request.messages.len());
    for msg in &request.messages {
        let role = match msg.role {
            ChatRole::System => {
                system.push(SystemContentBlock::Text(msg.content.clone()));
                continue;
            }
            ChatRole::User => ConversationRole::User,
            ChatRole::Assistant => ConversationRole::Assistant,
        };
        let message = Message::builder()
            .role(role)
            .content(ContentBlock::Text(msg.content.clone()))
            .build()
            .map_err(|e| LlmError::Invocation(e.to_string()))?;
        messages.push(message);
    }

    Ok((system, messages))
}

fn inference_config(request: &CompletionRequest) -> Option<InferenceConfiguration> {
    if request.max_tokens.is_none() && request.temperature.is_none() {
        return None;
    }
    Some(
        InferenceConfiguration::builder()
            .set_max_tokens(request.max_tokens.map(|t| t as i32))
            .set_temperature(request.temperature)
            .build(),
    )
}

fn token_count(usage: &aws_sdk_bedrockruntime::types::TokenUsage) -> TokenCount {
    TokenCount {
        input: usage.input_tokens as u64,
        output: usage.output_tokens as u64,
    }
}

#[async_trait]
impl LlmClient for BedrockClient {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let (system, messages) = to_converse(request)?;

        let response = self
            .client
            .converse()
            .model_id(&self.model_id)
            .set_system(Some(system))
            .set_messages(Some(messages))
            .set_inference_config(inference_config(request))
            .send()
            .await
            .map_err(|e| LlmError::Invocation(e.into_service_error().to_string()))?;

        let output_message = response
            .output()
            .and_then(|o| o.as_message().ok())
            .ok_or_else(|| LlmError::ResponseParse("no message in response".to_string()))?;

        let text = output_message
            .content()
            .iter()
            .filter_map(|block| {
                if let ContentBlock::Text(text) = block {
                    Some(text.as_str())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        let tokens = response.usage().map(token_count).unwrap_or_default();

        info!(
            model_id = %self.model_id,
            input_tokens = tokens.input,
            output_tokens = tokens.output,
            "converse finished"
        );

        Ok(Completion { text, tokens })
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream, LlmError> {
        let (system, messages) = to_converse(request)?;

        let output = self
            .client
            .converse_stream()
            .model_id(&self.model_id)
            .set_system(Some(system))
            .set_messages(Some(messages))
            .set_inference_config(inference_config(request))
            .send()
            .await
            .map_err(|e| LlmError::Invocation(e.into_service_error().to_string()))?;

        Ok(Box::pin(futures::stream::unfold(
            Some(output.stream),
            next_chunk,
        )))
    }
}

type ConverseReceiver = EventReceiver<ConverseStreamOutput, ConverseStreamOutputError>;

/// Pull events until one carries text or usage, or the stream ends. The
/// stream ends after the first receive error.
async fn next_chunk(
    receiver: Option<ConverseReceiver>,
) -> Option<(Result<StreamChunk, LlmError>, Option<ConverseReceiver>)> {
    let mut receiver = receiver?;
    loop {
        match receiver.recv().await {
            Ok(Some(ConverseStreamOutput::ContentBlockDelta(event))) => {
                if let Some(ContentBlockDelta::Text(text)) = event.delta() {
                    return Some((Ok(StreamChunk::Token(text.clone())), Some(receiver)));
                }
            }
            Ok(Some(ConverseStreamOutput::Metadata(event))) => {
                if let Some(usage) = event.usage() {
                    return Some((Ok(StreamChunk::Usage(token_count(usage))), Some(receiver)));
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => return None,
            Err(e) => return Some((Err(LlmError::Stream(e.to_string())), None)),
        }
    }
}
