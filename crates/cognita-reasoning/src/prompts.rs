//! Built-in prompt templates.
//!
//! Every stage asks for a single JSON object so the output can be parsed
//! and handed to the next stage. Placeholders available to every stage:
//! `patientContext`, `question`. Later stages additionally see the JSON
//! output of earlier ones: `patientAnalysis`, `diagnosticConsiderations`,
//! `treatmentRecommendations`.

use cognita_core::models::stage::StageKind;

use crate::template::PromptTemplate;

const CLINICAL_ROLE: &str = "\
You are a clinical decision-support assistant for licensed psychologists. \
You support, and never replace, the clinician's own judgement. \
Base every statement on the patient information provided; when the \
information is insufficient, say so rather than speculate. \
Use DSM-5-TR terminology and include ICD-10-CM codes where appropriate.";

const JSON_ONLY: &str = "\
Respond with a single JSON object and nothing else: no Markdown, no \
code fences, no commentary before or after it.";

const PATIENT_ANALYSIS_USER: &str = r#"Review the patient record below in light of the clinician's question.

<patient_context>
{{patientContext}}
</patient_context>

<question>
{{question}}
</question>

Return JSON with exactly these keys:
{
  "key_findings": ["clinically significant findings from the record"],
  "symptom_summary": "a concise narrative of the current symptom picture",
  "risk_factors": ["risk factors, including any safety concerns"],
  "protective_factors": ["strengths and protective factors"],
  "information_gaps": ["information that is missing and would change the assessment"]
}"#;

const DIAGNOSTIC_USER: &str = r#"Using the patient record and the structured analysis below, identify the diagnostic considerations relevant to the clinician's question.

<patient_context>
{{patientContext}}
</patient_context>

<question>
{{question}}
</question>

<patient_analysis>
{{patientAnalysis}}
</patient_analysis>

Return JSON with exactly these keys:
{
  "considerations": [
    {
      "condition": "diagnosis name",
      "code": "ICD-10-CM code or null",
      "likelihood": "high | moderate | low",
      "rationale": "why this is being considered",
      "supporting_evidence": ["findings that support it"],
      "ruling_out": ["what would need to be ruled out or clarified"]
    }
  ],
  "differential_notes": "how the considerations relate and what distinguishes them"
}
Order considerations from most to least likely."#;

const TREATMENT_USER: &str = r#"Based on the diagnostic considerations below, recommend evidence-based treatment options.

<patient_context>
{{patientContext}}
</patient_context>

<question>
{{question}}
</question>

<patient_analysis>
{{patientAnalysis}}
</patient_analysis>

<diagnostic_considerations>
{{diagnosticConsiderations}}
</diagnostic_considerations>

Return JSON with exactly these keys:
{
  "suggestions": [
    {
      "approach": "name of the intervention",
      "description": "what it involves for this patient",
      "rationale": "why it fits the findings",
      "evidence_level": "strength of the evidence base, or null",
      "priority": 1
    }
  ],
  "monitoring": ["what to track over the course of treatment"]
}
Priority 1 is the most urgent. Address any safety concern first."#;

const INTEGRATED_USER: &str = r#"Write the final answer to the clinician's question by integrating the analysis steps below.

<question>
{{question}}
</question>

<patient_analysis>
{{patientAnalysis}}
</patient_analysis>

<diagnostic_considerations>
{{diagnosticConsiderations}}
</diagnostic_considerations>

<treatment_recommendations>
{{treatmentRecommendations}}
</treatment_recommendations>

Return JSON with exactly these keys:
{
  "summary": "a direct answer to the question in a few sentences",
  "diagnostic_considerations": [ same shape as in the diagnostic step ],
  "treatment_suggestions": [ same shape as in the treatment step ],
  "references": [ { "citation": "APA-style citation", "url": "https link or null" } ],
  "follow_up_questions": ["questions the clinician could explore next"],
  "caveats": ["limitations of this analysis"]
}
Cite only well-established sources such as the DSM-5-TR, published clinical practice guidelines and peer-reviewed literature."#;

/// The built-in template for `stage`.
pub fn builtin(stage: StageKind) -> PromptTemplate {
    let user = match stage {
        StageKind::PatientAnalysis => PATIENT_ANALYSIS_USER,
        StageKind::DiagnosticConsiderations => DIAGNOSTIC_USER,
        StageKind::TreatmentRecommendations => TREATMENT_USER,
        StageKind::IntegratedResponse => INTEGRATED_USER,
    };
    PromptTemplate::new(format!("{CLINICAL_ROLE}\n\n{JSON_ONLY}"), user)
}
