use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cognita_core::error::CoreError;
use cognita_core::models::cost::CostEstimate;
use cognita_llm::tokens::{get_pricing, usage_for};

use crate::error::ApiError;
use crate::records;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CostEstimateRequest {
    pub patient_id: Uuid,
    pub question: String,
}

#[derive(Serialize)]
pub struct CostEstimateResponse {
    pub estimate: CostEstimate,
    /// False when the configured model has no known pricing and the
    /// cost is reported as zero.
    pub priced: bool,
}

/// Estimate what answering a question would cost under the configured
/// model, before running it.
pub async fn estimate_cost(
    State(state): State<AppState>,
    Json(req): Json<CostEstimateRequest>,
) -> Result<Json<CostEstimateResponse>, ApiError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(CoreError::MissingField("question".to_string()).into());
    }

    let store = state.store.as_ref();
    let patient = records::load_patient(store, req.patient_id).await?;
    let snapshot = records::load_snapshot(store, patient, Uuid::nil()).await?;

    let model_id = state.flow.model_id().to_string();
    let today = jiff::Zoned::now().date();
    let tokens = state.flow.estimate_tokens(&snapshot, question, today);
    let usage = usage_for(&model_id, tokens);

    Ok(Json(CostEstimateResponse {
        priced: get_pricing(&model_id).is_some(),
        estimate: CostEstimate {
            model_id,
            estimated_tokens: usage.tokens,
            estimated_cost_usd: usage.cost_usd,
        },
    }))
}
