use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::response::ClinicalResponse;
use super::stage::StageReport;
use super::token_count::TokenUsage;
use crate::error::CoreError;

/// A natural-language question about a patient and, once processed, its
/// structured answer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClinicalQuery {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub question: String,
    pub status: QueryStatus,
    pub model_id: String,
    pub response: Option<ClinicalResponse>,
    #[serde(default)]
    pub stages: Vec<StageReport>,
    #[serde(default)]
    pub usage: TokenUsage,
    pub error: Option<String>,
    pub created_at: jiff::Timestamp,
    pub completed_at: Option<jiff::Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum QueryStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl ClinicalQuery {
    pub fn new(
        patient_id: Uuid,
        question: &str,
        model_id: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(CoreError::MissingField("question".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            patient_id,
            question: question.to_string(),
            status: QueryStatus::Pending,
            model_id: model_id.into(),
            response: None,
            stages: Vec::new(),
            usage: TokenUsage::default(),
            error: None,
            created_at: jiff::Timestamp::now(),
            completed_at: None,
        })
    }

    pub fn complete(
        &mut self,
        response: ClinicalResponse,
        stages: Vec<StageReport>,
        usage: TokenUsage,
    ) {
        self.status = QueryStatus::Complete;
        self.response = Some(response);
        self.stages = stages;
        self.usage = usage;
        self.error = None;
        self.completed_at = Some(jiff::Timestamp::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = QueryStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(jiff::Timestamp::now());
    }
}
