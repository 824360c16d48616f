//! Storage key conventions.
//!
//! Pure string functions. Everything belonging to a patient lives under
//! `patients/{id}/` so deleting a patient is a single prefix delete.

use uuid::Uuid;

use crate::models::stage::StageKind;

pub const PATIENTS_PREFIX: &str = "patients/";

pub const PROMPTS_PREFIX: &str = "prompts/";

pub fn patient_prefix(id: Uuid) -> String {
    format!("patients/{id}/")
}

pub fn patient(id: Uuid) -> String {
    format!("patients/{id}/patient.json")
}

pub fn history(patient_id: Uuid) -> String {
    format!("patients/{patient_id}/history.json")
}

pub fn tests_prefix(patient_id: Uuid) -> String {
    format!("patients/{patient_id}/tests/")
}

pub fn test_result(patient_id: Uuid, id: Uuid) -> String {
    format!("patients/{patient_id}/tests/{id}.json")
}

pub fn queries_prefix(patient_id: Uuid) -> String {
    format!("patients/{patient_id}/queries/")
}

pub fn query(patient_id: Uuid, id: Uuid) -> String {
    format!("patients/{patient_id}/queries/{id}.json")
}

/// Operator-supplied prompt override for a pipeline stage.
pub fn prompt_override(stage: StageKind) -> String {
    format!("prompts/{}.md", stage.as_str())
}

/// Returns true for keys that hold a patient record itself (as opposed to
/// nested history, tests or queries).
pub fn is_patient_record(key: &str) -> bool {
    key.strip_prefix(PATIENTS_PREFIX)
        .and_then(|rest| rest.split_once('/'))
        .is_some_and(|(_, file)| file == "patient.json")
}
