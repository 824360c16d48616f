use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The structured answer to a clinical query.
///
/// Every collection field defaults to empty so partially-formed model
/// output still deserializes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClinicalResponse {
    pub summary: String,
    #[serde(default)]
    pub diagnostic_considerations: Vec<DiagnosticConsideration>,
    #[serde(default)]
    pub treatment_suggestions: Vec<TreatmentSuggestion>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    #[serde(default)]
    pub caveats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiagnosticConsideration {
    pub condition: String,
    /// ICD-10 or DSM-5-TR code when the model supplies one.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub likelihood: Likelihood,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
    #[serde(default)]
    pub ruling_out: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Likelihood {
    High,
    Moderate,
    Low,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Likelihood {
    pub fn label(&self) -> &'static str {
        match self {
            Likelihood::High => "high",
            Likelihood::Moderate => "moderate",
            Likelihood::Low => "low",
            Likelihood::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TreatmentSuggestion {
    pub approach: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub evidence_level: Option<String>,
    /// 1 is most urgent.
    #[serde(default)]
    pub priority: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reference {
    pub citation: String,
    #[serde(default)]
    pub url: Option<String>,
}
