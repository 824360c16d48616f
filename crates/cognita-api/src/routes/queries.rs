use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use cognita_core::keys;
use cognita_core::models::patient::Patient;
use cognita_core::models::query::{ClinicalQuery, QueryStatus};
use cognita_core::models::response::ClinicalResponse;
use cognita_reasoning::FlowEvent;
use cognita_render::{render_response_html, render_response_text};
use cognita_storage::json::{load_json, save_json};

use crate::audit::AuditEvent;
use crate::error::ApiError;
use crate::records;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

pub async fn list_queries(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<ClinicalQuery>>, ApiError> {
    records::load_patient(state.store.as_ref(), patient_id).await?;
    Ok(Json(
        records::list_queries(state.store.as_ref(), patient_id).await?,
    ))
}

/// Ask a question and wait for the full answer.
///
/// The flow runs in its own task so a client that gives up early does not
/// leave the stored query `Processing`.
pub async fn create_query(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Result<(StatusCode, Json<ClinicalQuery>), ApiError> {
    let (patient, query) = begin_query(&state, patient_id, &req.question).await?;
    let query = tokio::spawn(async move { finish_query(&state, patient, query, None).await })
        .await
        .map_err(|e| ApiError::Internal(format!("query task failed: {e}")))??;
    Ok((StatusCode::CREATED, Json(query)))
}

pub async fn get_query(
    State(state): State<AppState>,
    Path((patient_id, query_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ClinicalQuery>, ApiError> {
    Ok(Json(load_query(&state, patient_id, query_id).await?))
}

pub async fn delete_query(
    State(state): State<AppState>,
    Path((patient_id, query_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    load_query(&state, patient_id, query_id).await?;
    state
        .store
        .delete(&keys::query(patient_id, query_id))
        .await?;
    AuditEvent::new("delete", "clinical_query", query_id, patient_id).emit();
    Ok(StatusCode::NO_CONTENT)
}

/// The answer as an HTML fragment.
pub async fn query_html(
    State(state): State<AppState>,
    Path((patient_id, query_id)): Path<(Uuid, Uuid)>,
) -> Result<Html<String>, ApiError> {
    let query = load_query(&state, patient_id, query_id).await?;
    let response = answered(&query)?;
    Ok(Html(render_response_html(response)?))
}

/// The answer as plain text.
pub async fn query_text(
    State(state): State<AppState>,
    Path((patient_id, query_id)): Path<(Uuid, Uuid)>,
) -> Result<String, ApiError> {
    let query = load_query(&state, patient_id, query_id).await?;
    Ok(render_response_text(answered(&query)?))
}

async fn load_query(
    state: &AppState,
    patient_id: Uuid,
    query_id: Uuid,
) -> Result<ClinicalQuery, ApiError> {
    load_json(state.store.as_ref(), &keys::query(patient_id, query_id))
        .await
        .map_err(|e| match e {
            cognita_storage::error::StorageError::NotFound { .. } => {
                ApiError::NotFound(format!("query not found: {query_id}"))
            }
            other => other.into(),
        })
}

fn answered(query: &ClinicalQuery) -> Result<&ClinicalResponse, ApiError> {
    query
        .response
        .as_ref()
        .ok_or_else(|| ApiError::NotFound(format!("query {} has no response yet", query.id)))
}

/// Validate the request and persist the query as `Processing`.
pub(crate) async fn begin_query(
    state: &AppState,
    patient_id: Uuid,
    question: &str,
) -> Result<(Patient, ClinicalQuery), ApiError> {
    let store = state.store.as_ref();
    let patient = records::load_patient(store, patient_id).await?;
    let mut query = ClinicalQuery::new(patient_id, question, state.flow.model_id())?;
    query.status = QueryStatus::Processing;
    save_json(store, &keys::query(patient_id, query.id), &query).await?;
    AuditEvent::new("create", "clinical_query", query.id, patient_id).emit();
    Ok((patient, query))
}

/// Run the reasoning flow for a `Processing` query and store the answer.
///
/// The flow itself never fails. Only a storage error while gathering the
/// patient's records marks the query `Failed`.
pub(crate) async fn finish_query(
    state: &AppState,
    patient: Patient,
    mut query: ClinicalQuery,
    events: Option<&mpsc::Sender<FlowEvent>>,
) -> Result<ClinicalQuery, ApiError> {
    let store = state.store.as_ref();
    let key = keys::query(query.patient_id, query.id);

    let snapshot = match records::load_snapshot(store, patient, query.id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            query.fail(e.to_string());
            if let Err(save_err) = save_json(store, &key, &query).await {
                warn!(query_id = %query.id, error = %save_err, "failed to record query failure");
            }
            return Err(e.into());
        }
    };

    let today = jiff::Zoned::now().date();
    let outcome = state
        .flow
        .run(&snapshot, &query.question, today, events)
        .await;
    if outcome.fully_fallback() {
        warn!(query_id = %query.id, "every stage fell back; storing fallback answer");
    }

    query.complete(outcome.response, outcome.stages, outcome.usage);
    save_json(store, &key, &query).await?;
    info!(
        query_id = %query.id,
        patient_id = %query.patient_id,
        model_id = %query.model_id,
        cost_usd = query.usage.cost_usd,
        "query complete"
    );
    Ok(query)
}
