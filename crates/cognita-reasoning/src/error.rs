use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("template references unknown placeholder: {{{{{0}}}}}")]
    MissingPlaceholder(String),

    #[error("no template registered for stage {0}")]
    MissingTemplate(String),

    #[error("malformed prompt template: {0}")]
    TemplateFormat(String),

    #[error("could not parse model output: {0}")]
    Parse(String),

    #[error(transparent)]
    Llm(#[from] cognita_llm::LlmError),

    #[error(transparent)]
    Storage(#[from] cognita_storage::error::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
