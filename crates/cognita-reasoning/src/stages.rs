//! Structured outputs of the intermediate pipeline stages and the
//! fallbacks used when a stage cannot produce one.

use cognita_core::models::response::{
    ClinicalResponse, DiagnosticConsideration, TreatmentSuggestion,
};
use serde::{Deserialize, Serialize};

const UNAVAILABLE: &str = "Automated analysis was unavailable for this step. \
Rely on your own clinical assessment.";

/// Stage one output. `symptom_summary` is required so an unrelated JSON
/// object in the reply is not mistaken for an analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientAnalysis {
    #[serde(default)]
    pub key_findings: Vec<String>,
    pub symptom_summary: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub protective_factors: Vec<String>,
    #[serde(default)]
    pub information_gaps: Vec<String>,
}

impl PatientAnalysis {
    pub fn fallback() -> Self {
        Self {
            key_findings: Vec::new(),
            symptom_summary: UNAVAILABLE.to_string(),
            risk_factors: Vec::new(),
            protective_factors: Vec::new(),
            information_gaps: vec![
                "Automated review of the patient record did not complete.".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticAssessment {
    pub considerations: Vec<DiagnosticConsideration>,
    #[serde(default)]
    pub differential_notes: String,
}

impl DiagnosticAssessment {
    pub fn fallback() -> Self {
        Self {
            considerations: Vec::new(),
            differential_notes: UNAVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPlan {
    pub suggestions: Vec<TreatmentSuggestion>,
    #[serde(default)]
    pub monitoring: Vec<String>,
}

impl TreatmentPlan {
    pub fn fallback() -> Self {
        Self {
            suggestions: Vec::new(),
            monitoring: vec![UNAVAILABLE.to_string()],
        }
    }
}

/// The integrated response when the final stage fails.
///
/// Whatever the earlier stages produced is carried over so the clinician
/// still sees the partial analysis.
pub fn fallback_response(
    analysis: &PatientAnalysis,
    diagnostics: &DiagnosticAssessment,
    plan: &TreatmentPlan,
) -> ClinicalResponse {
    let summary = if analysis.symptom_summary.trim().is_empty()
        || analysis.symptom_summary == UNAVAILABLE
    {
        "An integrated answer could not be generated. Any findings below come \
         from intermediate analysis steps and have not been synthesised."
            .to_string()
    } else {
        analysis.symptom_summary.clone()
    };

    ClinicalResponse {
        summary,
        diagnostic_considerations: diagnostics.considerations.clone(),
        treatment_suggestions: plan.suggestions.clone(),
        references: Vec::new(),
        follow_up_questions: analysis.information_gaps.clone(),
        caveats: vec![
            "The final synthesis step failed; this response was assembled from \
             intermediate results."
                .to_string(),
            "All content is decision support only and must be verified clinically."
                .to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use cognita_core::models::response::Likelihood;

    use super::*;
    use crate::extract::extract_json;

    #[test]
    fn unrelated_objects_are_not_stage_outputs() {
        let refusal = r#"{"error": "I cannot provide diagnoses"}"#;
        assert!(serde_json::from_str::<PatientAnalysis>(refusal).is_err());
        assert!(serde_json::from_str::<DiagnosticAssessment>(refusal).is_err());
        assert!(serde_json::from_str::<TreatmentPlan>(refusal).is_err());
    }

    #[test]
    fn leading_schema_note_is_skipped() {
        let text = r#"Schema reminder {"note": "draft"} and the answer: {"symptom_summary": "Low mood", "key_findings": ["anhedonia"]}"#;
        let analysis: PatientAnalysis = extract_json(text).unwrap();
        assert_eq!(analysis.symptom_summary, "Low mood");
        assert_eq!(analysis.key_findings, vec!["anhedonia"]);
    }

    #[test]
    fn fallback_response_from_fallbacks_is_explicit() {
        let r = fallback_response(
            &PatientAnalysis::fallback(),
            &DiagnosticAssessment::fallback(),
            &TreatmentPlan::fallback(),
        );
        assert!(r.summary.starts_with("An integrated answer could not be generated"));
        assert!(r.diagnostic_considerations.is_empty());
        assert_eq!(r.caveats.len(), 2);
    }

    #[test]
    fn fallback_response_keeps_partial_results() {
        let analysis = PatientAnalysis {
            symptom_summary: "Two months of anhedonia and insomnia.".to_string(),
            information_gaps: vec!["Substance use not documented".to_string()],
            ..Default::default()
        };
        let diagnostics = DiagnosticAssessment {
            considerations: vec![DiagnosticConsideration {
                condition: "Major depressive disorder".to_string(),
                code: Some("F32.1".to_string()),
                likelihood: Likelihood::High,
                rationale: String::new(),
                supporting_evidence: Vec::new(),
                ruling_out: Vec::new(),
            }],
            differential_notes: String::new(),
        };
        let r = fallback_response(&analysis, &diagnostics, &TreatmentPlan::fallback());
        assert_eq!(r.summary, "Two months of anhedonia and insomnia.");
        assert_eq!(r.diagnostic_considerations.len(), 1);
        assert_eq!(r.follow_up_questions, vec!["Substance use not documented"]);
    }
}
