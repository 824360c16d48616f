use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use cognita_core::keys;
use cognita_core::models::patient::{Patient, PatientFields};
use cognita_storage::json::save_json;

use crate::audit::AuditEvent;
use crate::error::ApiError;
use crate::records;
use crate::state::AppState;

pub async fn list_patients(State(state): State<AppState>) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(records::list_patients(state.store.as_ref()).await?))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(records::load_patient(state.store.as_ref(), id).await?))
}

pub async fn create_patient(
    State(state): State<AppState>,
    Json(fields): Json<PatientFields>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let patient = fields.into_patient()?;
    save_json(state.store.as_ref(), &keys::patient(patient.id), &patient).await?;
    AuditEvent::new("create", "patient", patient.id, patient.id).emit();
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(fields): Json<PatientFields>,
) -> Result<Json<Patient>, ApiError> {
    let mut patient = records::load_patient(state.store.as_ref(), id).await?;
    patient.apply(fields)?;
    save_json(state.store.as_ref(), &keys::patient(id), &patient).await?;
    AuditEvent::new("update", "patient", id, id).emit();
    Ok(Json(patient))
}

/// Delete a patient and everything stored under it.
pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    records::load_patient(state.store.as_ref(), id).await?;
    let removed = state
        .store
        .delete_prefix(&keys::patient_prefix(id))
        .await?;
    AuditEvent::new("delete", "patient", id, id)
        .with_details(serde_json::json!({ "objects_removed": removed }))
        .emit();
    Ok(StatusCode::NO_CONTENT)
}
