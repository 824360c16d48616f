//! `ClinicalReasoningFlow`: the four-stage prompt pipeline.
//!
//! Stages run strictly in order:
//!
//! 1. patient analysis
//! 2. diagnostic considerations
//! 3. treatment recommendations
//! 4. integrated response
//!
//! Each stage renders its template, calls the model, and parses a JSON
//! object out of the reply. The next stage receives the previous stage's
//! output re-serialized as JSON. Any failure inside a stage (template,
//! network, parse) swaps in that stage's fallback and the pipeline carries
//! on, so a question always gets an answer.

use std::collections::HashMap;
use std::sync::Arc;

use cognita_core::models::response::ClinicalResponse;
use cognita_core::models::stage::{StageKind, StageReport};
use cognita_core::models::token_count::{TokenCount, TokenUsage};
use cognita_llm::tokens::{estimate_tokens, usage_for};
use cognita_llm::{Completion, CompletionRequest, LlmClient, StreamChunk, collect_stream};
use futures::StreamExt;
use jiff::civil::Date;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::context::{PatientSnapshot, build_patient_context};
use crate::error::ReasoningError;
use crate::extract::extract_json;
use crate::stages::{DiagnosticAssessment, PatientAnalysis, TreatmentPlan, fallback_response};
use crate::template::TemplateStore;

/// Placeholder names available to templates.
pub mod placeholder {
    pub const PATIENT_CONTEXT: &str = "patientContext";
    pub const QUESTION: &str = "question";
    pub const PATIENT_ANALYSIS: &str = "patientAnalysis";
    pub const DIAGNOSTIC_CONSIDERATIONS: &str = "diagnosticConsiderations";
    pub const TREATMENT_RECOMMENDATIONS: &str = "treatmentRecommendations";
}

/// Assumed model output per stage for pre-flight estimates.
pub const ASSUMED_STAGE_OUTPUT_TOKENS: u64 = 600;

/// Progress notifications for a running flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    StageStarted(StageKind),
    StageCompleted { stage: StageKind, used_fallback: bool },
    /// A text delta from the integrated-response stage.
    Token(String),
    Completed(ClinicalResponse),
}

/// The result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub response: ClinicalResponse,
    pub stages: Vec<StageReport>,
    pub usage: TokenUsage,
}

impl FlowOutcome {
    /// True when no stage produced model output.
    pub fn fully_fallback(&self) -> bool {
        self.stages.iter().all(|s| s.used_fallback)
    }
}

pub struct ClinicalReasoningFlow {
    llm: Arc<dyn LlmClient>,
    templates: TemplateStore,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl ClinicalReasoningFlow {
    pub fn new(llm: Arc<dyn LlmClient>, templates: TemplateStore) -> Self {
        Self {
            llm,
            templates,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Pre-flight token estimate for answering `question`.
    ///
    /// Each stage is charged its template, the patient context and question
    /// where the template uses them, plus one assumed output per earlier
    /// stage fed forward. Every stage is assumed to produce
    /// [`ASSUMED_STAGE_OUTPUT_TOKENS`] (or `max_tokens`, if lower).
    pub fn estimate_tokens(&self, snapshot: &PatientSnapshot, question: &str, today: Date) -> TokenCount {
        let context_tokens = estimate_tokens(&build_patient_context(snapshot, today));
        let question_tokens = estimate_tokens(question);
        let stage_output = self
            .max_tokens
            .map_or(ASSUMED_STAGE_OUTPUT_TOKENS, |max| {
                ASSUMED_STAGE_OUTPUT_TOKENS.min(u64::from(max))
            });

        let mut total = TokenCount::default();
        for (position, stage) in StageKind::ALL.into_iter().enumerate() {
            let Ok(template) = self.templates.get(stage) else {
                continue;
            };
            let mut input = estimate_tokens(&template.system) + estimate_tokens(&template.user);
            if template.uses(placeholder::PATIENT_CONTEXT) {
                input += context_tokens;
            }
            if template.uses(placeholder::QUESTION) {
                input += question_tokens;
            }
            input += stage_output * position as u64;
            total += TokenCount {
                input,
                output: stage_output,
            };
        }
        total
    }

    /// Answer `question` about the patient in `snapshot`.
    ///
    /// With `events`, progress is reported and the final stage is streamed
    /// token by token. A closed receiver is ignored.
    pub async fn run(
        &self,
        snapshot: &PatientSnapshot,
        question: &str,
        today: Date,
        events: Option<&mpsc::Sender<FlowEvent>>,
    ) -> FlowOutcome {
        let patient_id = snapshot.patient.id;
        info!(
            patient_id = %patient_id,
            model_id = %self.llm.model_id(),
            "starting clinical reasoning flow"
        );

        let mut vars: HashMap<&str, String> = HashMap::new();
        vars.insert(
            placeholder::PATIENT_CONTEXT,
            build_patient_context(snapshot, today),
        );
        vars.insert(placeholder::QUESTION, question.to_string());

        let mut reports = Vec::with_capacity(StageKind::ALL.len());

        let analysis: PatientAnalysis = self
            .run_stage(StageKind::PatientAnalysis, &vars, events, &mut reports, PatientAnalysis::fallback)
            .await;
        vars.insert(placeholder::PATIENT_ANALYSIS, to_prompt_json(&analysis));

        let diagnostics: DiagnosticAssessment = self
            .run_stage(
                StageKind::DiagnosticConsiderations,
                &vars,
                events,
                &mut reports,
                DiagnosticAssessment::fallback,
            )
            .await;
        vars.insert(
            placeholder::DIAGNOSTIC_CONSIDERATIONS,
            to_prompt_json(&diagnostics),
        );

        let plan: TreatmentPlan = self
            .run_stage(
                StageKind::TreatmentRecommendations,
                &vars,
                events,
                &mut reports,
                TreatmentPlan::fallback,
            )
            .await;
        vars.insert(placeholder::TREATMENT_RECOMMENDATIONS, to_prompt_json(&plan));

        let response: ClinicalResponse = self
            .run_stage(StageKind::IntegratedResponse, &vars, events, &mut reports, || {
                fallback_response(&analysis, &diagnostics, &plan)
            })
            .await;

        let mut usage = TokenUsage::default();
        for report in &reports {
            usage += report.usage;
        }

        emit(events, FlowEvent::Completed(response.clone())).await;

        let fallbacks = reports.iter().filter(|r| r.used_fallback).count();
        info!(
            patient_id = %patient_id,
            fallbacks,
            input_tokens = usage.tokens.input,
            output_tokens = usage.tokens.output,
            cost_usd = usage.cost_usd,
            "clinical reasoning flow complete"
        );

        FlowOutcome {
            response,
            stages: reports,
            usage,
        }
    }

    /// Run one stage, falling back on any error. Appends the stage report.
    async fn run_stage<T, F>(
        &self,
        stage: StageKind,
        vars: &HashMap<&str, String>,
        events: Option<&mpsc::Sender<FlowEvent>>,
        reports: &mut Vec<StageReport>,
        fallback: F,
    ) -> T
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        emit(events, FlowEvent::StageStarted(stage)).await;

        // Only the final stage is worth streaming to a reader.
        let stream_to = events.filter(|_| stage == StageKind::IntegratedResponse);

        let mut tokens = TokenCount::default();
        let result = match self.call(stage, vars, stream_to).await {
            Ok(call) => {
                tokens = call.tokens;
                extract_json::<T>(&call.text)
            }
            Err(e) => Err(e),
        };

        let (value, error) = match result {
            Ok(value) => (value, None),
            Err(e) => {
                warn!(stage = %stage, error = %e, "stage failed, using fallback");
                (fallback(), Some(e.to_string()))
            }
        };

        let used_fallback = error.is_some();
        let usage = usage_for(self.llm.model_id(), tokens);
        info!(
            stage = %stage,
            used_fallback,
            input_tokens = tokens.input,
            output_tokens = tokens.output,
            "stage finished"
        );

        reports.push(StageReport {
            stage,
            used_fallback,
            error,
            usage,
        });
        emit(events, FlowEvent::StageCompleted { stage, used_fallback }).await;

        value
    }

    async fn call(
        &self,
        stage: StageKind,
        vars: &HashMap<&str, String>,
        stream_to: Option<&mpsc::Sender<FlowEvent>>,
    ) -> Result<Completion, ReasoningError> {
        let (system, user) = self.templates.get(stage)?.render(vars)?;
        let request = CompletionRequest::single(system, user)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);

        let Some(tx) = stream_to else {
            return Ok(self.llm.complete(&request).await?);
        };

        let relayed = self
            .llm
            .complete_stream(&request)
            .await?
            .then(move |chunk| async move {
                if let Ok(StreamChunk::Token(text)) = &chunk {
                    emit(Some(tx), FlowEvent::Token(text.clone())).await;
                }
                chunk
            });
        Ok(collect_stream(Box::pin(relayed)).await?)
    }
}

async fn emit(events: Option<&mpsc::Sender<FlowEvent>>, event: FlowEvent) {
    if let Some(tx) = events {
        // A disconnected reader must not stop the flow.
        let _ = tx.send(event).await;
    }
}

fn to_prompt_json<T: Serialize>(value: &T) -> String {
    // These types are plain data; serialization cannot fail.
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
