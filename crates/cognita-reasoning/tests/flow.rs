//! End-to-end runs of the reasoning flow against a scripted model.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cognita_core::models::history::ClinicalHistory;
use cognita_core::models::patient::PatientFields;
use cognita_core::models::stage::StageKind;
use cognita_core::models::token_count::TokenCount;
use cognita_llm::{CompletionRequest, CompletionStream, LlmClient, LlmError, StreamChunk};
use cognita_reasoning::{
    ClinicalReasoningFlow, FlowEvent, PatientSnapshot, PromptTemplate, TemplateStore,
};
use jiff::civil::date;
use serde_json::json;
use tokio::sync::mpsc;

/// One scripted model turn.
enum Reply {
    Text(String),
    Down(String),
    /// Streams the text, then the connection drops.
    CutOff(String),
}

impl From<Result<String, String>> for Reply {
    fn from(reply: Result<String, String>) -> Self {
        match reply {
            Ok(text) => Reply::Text(text),
            Err(e) => Reply::Down(e),
        }
    }
}

/// Replies with queued outputs in order and records every request.
struct ScriptedLlm {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<Result<String, String>>) -> Arc<Self> {
        Self::scripted(replies.into_iter().map(Reply::from).collect())
    }

    fn scripted(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Small pieces so streaming is observable.
fn token_chunks(text: &str) -> Vec<Result<StreamChunk, LlmError>> {
    text.as_bytes()
        .chunks(16)
        .map(|c| Ok(StreamChunk::Token(String::from_utf8_lossy(c).into_owned())))
        .collect()
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn model_id(&self) -> &str {
        "claude-sonnet-4-test"
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Down("script exhausted".to_string()));

        let chunks = match reply {
            Reply::Down(e) => return Err(LlmError::Invocation(e)),
            Reply::Text(text) => {
                let mut chunks = token_chunks(&text);
                chunks.push(Ok(StreamChunk::Usage(TokenCount {
                    input: 1000,
                    output: 100,
                })));
                chunks
            }
            Reply::CutOff(text) => {
                let mut chunks = token_chunks(&text);
                chunks.push(Err(LlmError::Stream("connection reset".to_string())));
                chunks
            }
        };
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

fn snapshot() -> PatientSnapshot {
    let patient = PatientFields {
        first_name: "Sam".to_string(),
        last_name: "Okafor".to_string(),
        date_of_birth: Some(date(1988, 11, 20)),
        referral_reason: Some("panic attacks on public transport".to_string()),
        ..Default::default()
    }
    .into_patient()
    .unwrap();
    let mut history = ClinicalHistory::empty(patient.id);
    history.presenting_problem = "Recurrent unexpected panic attacks for 4 months".to_string();
    PatientSnapshot {
        patient,
        history,
        test_results: Vec::new(),
        prior_queries: Vec::new(),
    }
}

fn analysis_json() -> String {
    json!({
        "key_findings": ["recurrent unexpected panic attacks"],
        "symptom_summary": "Four months of panic attacks with avoidance of trains.",
        "risk_factors": [],
        "protective_factors": ["supportive partner"],
        "information_gaps": ["caffeine intake"]
    })
    .to_string()
}

fn diagnostics_json() -> String {
    json!({
        "considerations": [{
            "condition": "Panic disorder",
            "code": "F41.0",
            "likelihood": "high",
            "rationale": "recurrent unexpected attacks with persistent worry",
            "supporting_evidence": ["4 months duration"],
            "ruling_out": ["hyperthyroidism"]
        }],
        "differential_notes": "Consider agoraphobia given avoidance."
    })
    .to_string()
}

fn plan_json() -> String {
    json!({
        "suggestions": [{
            "approach": "CBT for panic disorder",
            "description": "interoceptive exposure",
            "rationale": "first-line",
            "evidence_level": "strong",
            "priority": 1
        }],
        "monitoring": ["PDSS weekly"]
    })
    .to_string()
}

fn integrated_json() -> String {
    format!(
        "```json\n{}\n```",
        json!({
            "summary": "Presentation is most consistent with panic disorder.",
            "diagnostic_considerations": [{ "condition": "Panic disorder", "likelihood": "high" }],
            "treatment_suggestions": [{ "approach": "CBT for panic disorder", "priority": 1 }],
            "references": [{ "citation": "American Psychiatric Association. (2022). DSM-5-TR." }],
            "follow_up_questions": ["Any nocturnal attacks?"],
            "caveats": []
        })
    )
}

fn flow(llm: Arc<ScriptedLlm>) -> ClinicalReasoningFlow {
    ClinicalReasoningFlow::new(llm, TemplateStore::builtin()).with_max_tokens(Some(2048))
}

#[tokio::test]
async fn happy_path_chains_stage_outputs() {
    let llm = ScriptedLlm::new(vec![
        Ok(analysis_json()),
        Ok(diagnostics_json()),
        Ok(plan_json()),
        Ok(integrated_json()),
    ]);
    let outcome = flow(llm.clone())
        .run(&snapshot(), "Is this panic disorder?", date(2025, 2, 1), None)
        .await;

    assert!(!outcome.fully_fallback());
    assert!(outcome.stages.iter().all(|s| !s.used_fallback));
    assert_eq!(
        outcome.stages.iter().map(|s| s.stage).collect::<Vec<_>>(),
        StageKind::ALL.to_vec()
    );
    assert_eq!(
        outcome.response.summary,
        "Presentation is most consistent with panic disorder."
    );
    assert_eq!(outcome.usage.tokens.input, 4000);
    assert_eq!(outcome.usage.tokens.output, 400);
    assert!(outcome.usage.cost_usd > 0.0);

    let requests = llm.requests();
    assert_eq!(requests.len(), 4);
    let first = &requests[0].messages[0].content;
    assert!(first.contains("Name: Sam Okafor"));
    assert!(first.contains("Is this panic disorder?"));
    assert!(!first.contains("{{"));
    // Each stage sees the previous stage's output.
    assert!(requests[1].messages[0].content.contains("recurrent unexpected panic attacks"));
    assert!(requests[2].messages[0].content.contains("F41.0"));
    assert!(requests[3].messages[0].content.contains("interoceptive exposure"));
    assert_eq!(requests[0].max_tokens, Some(2048));
}

#[tokio::test]
async fn unparseable_stage_falls_back_and_pipeline_continues() {
    let llm = ScriptedLlm::new(vec![
        Ok(analysis_json()),
        Ok("I'm not able to provide a diagnosis.".to_string()),
        Ok(plan_json()),
        Ok(integrated_json()),
    ]);
    let outcome = flow(llm.clone())
        .run(&snapshot(), "Is this panic disorder?", date(2025, 2, 1), None)
        .await;

    let diag = &outcome.stages[1];
    assert_eq!(diag.stage, StageKind::DiagnosticConsiderations);
    assert!(diag.used_fallback);
    assert!(diag.error.as_deref().unwrap().contains("could not parse model output"));
    // Tokens were still spent on the failed stage.
    assert_eq!(diag.usage.tokens.input, 1000);

    // The treatment stage received the fallback, not nothing.
    let requests = llm.requests();
    assert!(requests[2].messages[0].content.contains("Automated analysis was unavailable"));
    assert!(!outcome.stages[3].used_fallback);
}

#[tokio::test]
async fn total_outage_yields_fallback_response() {
    let llm = ScriptedLlm::new(vec![
        Err("connection refused".to_string()),
        Err("connection refused".to_string()),
        Err("connection refused".to_string()),
        Err("connection refused".to_string()),
    ]);
    let outcome = flow(llm)
        .run(&snapshot(), "Is this panic disorder?", date(2025, 2, 1), None)
        .await;

    assert!(outcome.fully_fallback());
    assert!(outcome.response.summary.starts_with("An integrated answer could not be generated"));
    assert_eq!(outcome.usage.tokens.total(), 0);
    assert!(
        outcome.stages[0]
            .error
            .as_deref()
            .unwrap()
            .contains("connection refused")
    );
}

#[tokio::test]
async fn final_stage_failure_keeps_intermediate_results() {
    let llm = ScriptedLlm::new(vec![
        Ok(analysis_json()),
        Ok(diagnostics_json()),
        Ok(plan_json()),
        Ok("{\"summary\": ".to_string()),
    ]);
    let outcome = flow(llm)
        .run(&snapshot(), "Is this panic disorder?", date(2025, 2, 1), None)
        .await;

    assert!(outcome.stages[3].used_fallback);
    assert_eq!(
        outcome.response.summary,
        "Four months of panic attacks with avoidance of trains."
    );
    assert_eq!(outcome.response.diagnostic_considerations[0].condition, "Panic disorder");
    assert_eq!(outcome.response.treatment_suggestions.len(), 1);
    assert_eq!(outcome.response.follow_up_questions, vec!["caffeine intake"]);
}

#[tokio::test]
async fn streaming_relays_final_stage_tokens_in_order() {
    let llm = ScriptedLlm::new(vec![
        Ok(analysis_json()),
        Ok(diagnostics_json()),
        Ok(plan_json()),
        Ok(integrated_json()),
    ]);
    let (tx, mut rx) = mpsc::channel(1024);
    let outcome = flow(llm)
        .run(&snapshot(), "Is this panic disorder?", date(2025, 2, 1), Some(&tx))
        .await;
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events[0], FlowEvent::StageStarted(StageKind::PatientAnalysis));
    assert_eq!(
        events[1],
        FlowEvent::StageCompleted {
            stage: StageKind::PatientAnalysis,
            used_fallback: false
        }
    );
    assert_eq!(
        events.last(),
        Some(&FlowEvent::Completed(outcome.response.clone()))
    );

    let streamed: String = events
        .iter()
        .filter_map(|e| match e {
            FlowEvent::Token(t) => Some(t.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(streamed, integrated_json());

    // Tokens only arrive after the final stage starts.
    let final_start = events
        .iter()
        .position(|e| *e == FlowEvent::StageStarted(StageKind::IntegratedResponse))
        .unwrap();
    let first_token = events
        .iter()
        .position(|e| matches!(e, FlowEvent::Token(_)))
        .unwrap();
    assert!(first_token > final_start);
}

#[tokio::test]
async fn dropped_receiver_does_not_abort_flow() {
    let llm = ScriptedLlm::new(vec![
        Ok(analysis_json()),
        Ok(diagnostics_json()),
        Ok(plan_json()),
        Ok(integrated_json()),
    ]);
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let outcome = flow(llm)
        .run(&snapshot(), "Is this panic disorder?", date(2025, 2, 1), Some(&tx))
        .await;

    assert!(!outcome.fully_fallback());
}

#[tokio::test]
async fn template_with_unknown_placeholder_falls_back_without_calling_model() {
    let llm = ScriptedLlm::new(vec![
        Ok(diagnostics_json()),
        Ok(plan_json()),
        Ok(integrated_json()),
    ]);
    let templates = TemplateStore::builtin().with_override(
        StageKind::PatientAnalysis,
        PromptTemplate::new("sys", "Summarise {{treatmentRecommendations}}"),
    );
    let outcome = ClinicalReasoningFlow::new(llm.clone(), templates)
        .run(&snapshot(), "Is this panic disorder?", date(2025, 2, 1), None)
        .await;

    assert!(outcome.stages[0].used_fallback);
    assert!(
        outcome.stages[0]
            .error
            .as_deref()
            .unwrap()
            .contains("{{treatmentRecommendations}}")
    );
    assert_eq!(llm.requests().len(), 3);
    assert!(!outcome.stages[1].used_fallback);
}

#[tokio::test]
async fn estimate_counts_every_stage_without_calling_model() {
    let llm = ScriptedLlm::new(Vec::new());
    let flow = flow(llm.clone());
    let today = date(2025, 2, 1);

    let short = flow.estimate_tokens(&snapshot(), "MDD?", today);
    let long = flow.estimate_tokens(&snapshot(), &"Is this panic disorder? ".repeat(40), today);

    assert_eq!(short.output, 4 * cognita_reasoning::flow::ASSUMED_STAGE_OUTPUT_TOKENS);
    assert!(long.input > short.input);
    assert!(llm.requests().is_empty());

    let capped = ClinicalReasoningFlow::new(llm, TemplateStore::builtin())
        .with_max_tokens(Some(100))
        .estimate_tokens(&snapshot(), "MDD?", today);
    assert_eq!(capped.output, 400);
}

#[tokio::test]
async fn estimate_charges_question_only_where_placeholder_appears() {
    let llm = ScriptedLlm::new(Vec::new());
    let today = date(2025, 2, 1);
    let long_question = "Is this panic disorder? ".repeat(40);
    let question_cost = |template: PromptTemplate| {
        let templates =
            TemplateStore::builtin().with_override(StageKind::PatientAnalysis, template);
        let flow = ClinicalReasoningFlow::new(llm.clone(), templates);
        flow.estimate_tokens(&snapshot(), &long_question, today).input
            - flow.estimate_tokens(&snapshot(), "MDD?", today).input
    };

    let prose = question_cost(PromptTemplate::new("sys", "Weigh the question carefully."));
    let in_system = question_cost(PromptTemplate::new("Question: {{ question }}", "Be careful."));
    assert!(in_system > prose);
}

#[tokio::test]
async fn wrong_shaped_reply_falls_back() {
    let llm = ScriptedLlm::new(vec![
        Ok(analysis_json()),
        Ok(r#"{"error": "I cannot provide diagnoses"}"#.to_string()),
        Ok(plan_json()),
        Ok(integrated_json()),
    ]);
    let outcome = flow(llm.clone())
        .run(&snapshot(), "Is this panic disorder?", date(2025, 2, 1), None)
        .await;

    assert!(!outcome.stages[0].used_fallback);
    assert!(outcome.stages[1].used_fallback);
    assert!(outcome.stages[1].error.is_some());
    // The treatment stage gets the diagnostic fallback, not an empty object.
    let treatment_prompt = &llm.requests()[2].messages[0].content;
    assert!(treatment_prompt.contains("Automated analysis was unavailable"));
}

#[tokio::test]
async fn leading_unrelated_object_is_skipped() {
    let llm = ScriptedLlm::new(vec![
        Ok(format!(
            r#"Schema reminder {{"note": "draft"}} and the answer: {}"#,
            analysis_json()
        )),
        Ok(diagnostics_json()),
        Ok(plan_json()),
        Ok(integrated_json()),
    ]);
    let outcome = flow(llm.clone())
        .run(&snapshot(), "Is this panic disorder?", date(2025, 2, 1), None)
        .await;

    assert!(!outcome.stages[0].used_fallback);
    let diagnostic_prompt = &llm.requests()[1].messages[0].content;
    assert!(diagnostic_prompt.contains("Four months of panic attacks with avoidance of trains."));
}

#[tokio::test]
async fn final_stage_dropping_mid_stream_falls_back_after_tokens() {
    let partial = integrated_json()[..40].to_string();
    let llm = ScriptedLlm::scripted(vec![
        Reply::Text(analysis_json()),
        Reply::Text(diagnostics_json()),
        Reply::Text(plan_json()),
        Reply::CutOff(partial.clone()),
    ]);
    let (tx, mut rx) = mpsc::channel(1024);
    let outcome = flow(llm)
        .run(&snapshot(), "Is this panic disorder?", date(2025, 2, 1), Some(&tx))
        .await;
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let streamed: String = events
        .iter()
        .filter_map(|e| match e {
            FlowEvent::Token(t) => Some(t.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(streamed, partial);

    let last_token = events
        .iter()
        .rposition(|e| matches!(e, FlowEvent::Token(_)))
        .unwrap();
    let final_done = events
        .iter()
        .position(|e| {
            *e == FlowEvent::StageCompleted {
                stage: StageKind::IntegratedResponse,
                used_fallback: true,
            }
        })
        .unwrap();
    assert!(last_token < final_done);
    assert_eq!(final_done, events.len() - 2);

    let Some(FlowEvent::Completed(response)) = events.last() else {
        panic!("expected Completed last, got {:?}", events.last());
    };
    assert_eq!(response, &outcome.response);
    assert_eq!(
        response.summary,
        "Four months of panic attacks with avoidance of trains."
    );
    assert_eq!(response.diagnostic_considerations[0].condition, "Panic disorder");
    assert!(response.caveats[0].starts_with("The final synthesis step failed"));
    assert!(outcome.stages[3].error.as_deref().unwrap().contains("connection reset"));
}
