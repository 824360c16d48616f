//! OpenAI-compatible chat completions (`POST {base_url}/chat/completions`).
//!
//! Works against OpenAI itself and the many servers that mimic it
//! (vLLM, Ollama, LM Studio, Azure-style gateways).

use std::time::Duration;

use async_trait::async_trait;
use cognita_core::models::token_count::TokenCount;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::sse::{SseAction, completion_stream_from_sse};
use crate::types::{ChatRole, Completion, CompletionRequest, CompletionStream, StreamChunk};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn new(model: impl Into<String>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: model.into(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let mut req = self.client.post(self.endpoint()).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }
        Ok(response)
    }
}

/// Build the JSON body for a chat completion request.
pub fn build_request_body(model: &str, request: &CompletionRequest, stream: bool) -> Value {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if !request.system_prompt.is_empty() {
        messages.push(json!({ "role": "system", "content": request.system_prompt }));
    }
    for m in &request.messages {
        let role = match m.role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        messages.push(json!({ "role": role, "content": m.content }));
    }

    let mut body = json!({
        "model": model,
        "messages": messages,
        "stream": stream,
    });
    if stream {
        body["stream_options"] = json!({ "include_usage": true });
    }
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    body
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl From<Usage> for TokenCount {
    fn from(u: Usage) -> Self {
        TokenCount {
            input: u.prompt_tokens,
            output: u.completion_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunkBody {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Interpret one SSE data payload from a streaming chat completion.
pub fn parse_stream_data(data: &str) -> Result<SseAction, LlmError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(SseAction::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseAction::Done);
    }

    let chunk: StreamChunkBody = serde_json::from_str(data)
        .map_err(|e| LlmError::ResponseParse(format!("bad stream chunk: {e}")))?;

    let mut out = Vec::new();
    if let Some(text) = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|t| !t.is_empty())
    {
        out.push(StreamChunk::Token(text));
    }
    if let Some(usage) = chunk.usage {
        out.push(StreamChunk::Usage(usage.into()));
    }

    if out.is_empty() {
        Ok(SseAction::Skip)
    } else {
        Ok(SseAction::Emit(out))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let body = build_request_body(&self.model, request, false);
        debug!(model = %self.model, "sending chat completion");

        let response: ChatCompletionResponse = self.post(&body).await?.json().await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::ResponseParse("no message in response".to_string()))?;
        let tokens = response.usage.map(TokenCount::from).unwrap_or_default();

        info!(
            model = %self.model,
            input_tokens = tokens.input,
            output_tokens = tokens.output,
            "chat completion finished"
        );

        Ok(Completion { text, tokens })
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream, LlmError> {
        let body = build_request_body(&self.model, request, true);
        debug!(model = %self.model, "opening chat completion stream");

        let response = self.post(&body).await?;
        Ok(completion_stream_from_sse(response, parse_stream_data))
    }
}
