use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use cognita_core::keys;
use cognita_core::models::history::{ClinicalHistory, HistoryUpdate};
use cognita_storage::json::save_json;

use crate::audit::AuditEvent;
use crate::error::ApiError;
use crate::records;
use crate::state::AppState;

/// A patient without a stored history gets an empty one.
pub async fn get_history(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ClinicalHistory>, ApiError> {
    records::load_patient(state.store.as_ref(), patient_id).await?;
    Ok(Json(
        records::load_history(state.store.as_ref(), patient_id).await?,
    ))
}

pub async fn put_history(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Json(update): Json<HistoryUpdate>,
) -> Result<Json<ClinicalHistory>, ApiError> {
    records::load_patient(state.store.as_ref(), patient_id).await?;
    let history = ClinicalHistory::from_update(patient_id, update);
    save_json(state.store.as_ref(), &keys::history(patient_id), &history).await?;
    AuditEvent::new("update", "clinical_history", patient_id, patient_id).emit();
    Ok(Json(history))
}
