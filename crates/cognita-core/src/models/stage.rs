use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::token_count::TokenUsage;

/// The steps of the clinical reasoning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StageKind {
    PatientAnalysis,
    DiagnosticConsiderations,
    TreatmentRecommendations,
    IntegratedResponse,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::PatientAnalysis,
        StageKind::DiagnosticConsiderations,
        StageKind::TreatmentRecommendations,
        StageKind::IntegratedResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::PatientAnalysis => "patient_analysis",
            StageKind::DiagnosticConsiderations => "diagnostic_considerations",
            StageKind::TreatmentRecommendations => "treatment_recommendations",
            StageKind::IntegratedResponse => "integrated_response",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened in one pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StageReport {
    pub stage: StageKind,
    pub used_fallback: bool,
    pub error: Option<String>,
    pub usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_name_matches_as_str() {
        for stage in StageKind::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }
}
