use std::sync::Arc;

use cognita_llm::LlmClient;
use cognita_llm::bedrock::BedrockClient;
use cognita_llm::openai::OpenAiClient;
use cognita_reasoning::{ClinicalReasoningFlow, TemplateStore};
use cognita_storage::client::build_s3_client;
use cognita_storage::{MemoryStore, ObjectStore, S3Store};

use crate::config::{AppConfig, LlmConfig, StorageConfig};

/// Shared application state, injected into all route handlers via Axum state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub flow: Arc<ClinicalReasoningFlow>,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>, flow: ClinicalReasoningFlow) -> Self {
        Self {
            store,
            flow: Arc::new(flow),
        }
    }

    /// Wire up storage, the model client and prompt templates from config.
    pub async fn from_config(config: &AppConfig) -> eyre::Result<Self> {
        let store: Arc<dyn ObjectStore> = match &config.storage {
            StorageConfig::S3 { bucket, region } => {
                let client = build_s3_client(region).await;
                let s3 = S3Store::new(client, bucket.clone());
                tracing::info!(bucket = s3.bucket(), region = %region, "using S3 storage");
                Arc::new(s3)
            }
            StorageConfig::Memory => {
                tracing::warn!("using in-memory storage; records are lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let llm: Arc<dyn LlmClient> = match &config.llm {
            LlmConfig::OpenAi { base_url, api_key } => Arc::new(
                OpenAiClient::new(config.model_id.clone())?
                    .with_base_url(base_url.clone())
                    .with_api_key(api_key.clone()),
            ),
            LlmConfig::Bedrock { region } => {
                Arc::new(BedrockClient::from_env(region, config.model_id.clone()).await)
            }
        };

        let templates = TemplateStore::load_overrides(store.as_ref()).await?;
        let flow = ClinicalReasoningFlow::new(llm, templates)
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature);

        Ok(Self::new(store, flow))
    }
}
