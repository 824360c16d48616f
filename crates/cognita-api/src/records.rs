//! Patient record access shared by the route handlers.

use cognita_core::keys;
use cognita_core::models::history::ClinicalHistory;
use cognita_core::models::patient::Patient;
use cognita_core::models::query::ClinicalQuery;
use cognita_core::models::test_result::TestResult;
use cognita_reasoning::PatientSnapshot;
use cognita_storage::ObjectStore;
use cognita_storage::error::StorageError;
use cognita_storage::json::{load_all_json, load_json, load_json_opt};
use uuid::Uuid;

use crate::error::ApiError;

/// Load a patient, mapping a missing record to a 404 naming the patient.
pub async fn load_patient(store: &dyn ObjectStore, id: Uuid) -> Result<Patient, ApiError> {
    match load_json(store, &keys::patient(id)).await {
        Ok(patient) => Ok(patient),
        Err(StorageError::NotFound { .. }) => Err(ApiError::patient_not_found(id)),
        Err(e) => Err(e.into()),
    }
}

/// All patients, sorted by last then first name (case-insensitive).
pub async fn list_patients(store: &dyn ObjectStore) -> Result<Vec<Patient>, StorageError> {
    let mut patients: Vec<Patient> =
        load_all_json(store, keys::PATIENTS_PREFIX, keys::is_patient_record).await?;
    patients.sort_by_cached_key(|p| (p.last_name.to_lowercase(), p.first_name.to_lowercase()));
    Ok(patients)
}

pub async fn load_history(
    store: &dyn ObjectStore,
    patient_id: Uuid,
) -> Result<ClinicalHistory, StorageError> {
    Ok(load_json_opt(store, &keys::history(patient_id))
        .await?
        .unwrap_or_else(|| ClinicalHistory::empty(patient_id)))
}

/// Test results, most recently administered first.
pub async fn list_tests(
    store: &dyn ObjectStore,
    patient_id: Uuid,
) -> Result<Vec<TestResult>, StorageError> {
    let mut tests: Vec<TestResult> =
        load_all_json(store, &keys::tests_prefix(patient_id), |_| true).await?;
    tests.sort_by(|a, b| {
        b.administered_on
            .cmp(&a.administered_on)
            .then(b.created_at.cmp(&a.created_at))
    });
    Ok(tests)
}

/// Queries, newest first.
pub async fn list_queries(
    store: &dyn ObjectStore,
    patient_id: Uuid,
) -> Result<Vec<ClinicalQuery>, StorageError> {
    let mut queries: Vec<ClinicalQuery> =
        load_all_json(store, &keys::queries_prefix(patient_id), |_| true).await?;
    queries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(queries)
}

/// Everything the reasoning flow needs about `patient`, leaving out the
/// query currently being answered.
pub async fn load_snapshot(
    store: &dyn ObjectStore,
    patient: Patient,
    current_query: Uuid,
) -> Result<PatientSnapshot, StorageError> {
    let history = load_history(store, patient.id).await?;
    let test_results = list_tests(store, patient.id).await?;
    let prior_queries = list_queries(store, patient.id)
        .await?
        .into_iter()
        .filter(|q| q.id != current_query)
        .collect();
    Ok(PatientSnapshot {
        patient,
        history,
        test_results,
        prior_queries,
    })
}
