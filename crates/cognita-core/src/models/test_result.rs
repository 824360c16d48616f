use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;

/// A psychometric instrument administered to a patient.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TestResult {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub instrument: String,
    pub administered_on: Date,
    pub score: Option<f64>,
    pub severity: Option<String>,
    pub interpretation: Option<String>,
    #[serde(default)]
    pub subscales: serde_json::Value,
    pub created_at: jiff::Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTestResult {
    pub instrument: String,
    pub administered_on: Date,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub interpretation: Option<String>,
    #[serde(default)]
    pub subscales: serde_json::Value,
}

impl NewTestResult {
    pub fn into_result(self, patient_id: Uuid) -> Result<TestResult, CoreError> {
        let instrument = self.instrument.trim();
        if instrument.is_empty() {
            return Err(CoreError::MissingField("instrument".to_string()));
        }
        if let Some(score) = self.score
            && !score.is_finite()
        {
            return Err(CoreError::InvalidField {
                field: "score".to_string(),
                reason: "must be a finite number".to_string(),
            });
        }
        Ok(TestResult {
            id: Uuid::new_v4(),
            patient_id,
            instrument: instrument.to_string(),
            administered_on: self.administered_on,
            score: self.score,
            severity: self.severity,
            interpretation: self.interpretation,
            subscales: self.subscales,
            created_at: jiff::Timestamp::now(),
        })
    }
}
