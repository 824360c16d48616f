//! cognita-llm
//!
//! Chat-completion clients. The reasoning pipeline talks to an
//! [`LlmClient`]; concrete backends speak either the OpenAI-compatible
//! HTTP API or the Bedrock Converse API.

pub mod bedrock;
pub mod client;
pub mod error;
pub mod openai;
pub mod sse;
pub mod tokens;
pub mod types;

pub use client::{LlmClient, collect_stream};
pub use error::LlmError;
pub use types::{ChatMessage, ChatRole, Completion, CompletionRequest, CompletionStream, StreamChunk};
