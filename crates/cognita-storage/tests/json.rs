use cognita_core::keys;
use cognita_core::models::history::ClinicalHistory;
use cognita_core::models::patient::{Patient, PatientFields};
use cognita_storage::MemoryStore;
use cognita_storage::ObjectStore;
use cognita_storage::json::{load_all_json, load_json, load_json_opt, save_json};
use uuid::Uuid;

fn patient(first: &str, last: &str) -> Patient {
    PatientFields {
        first_name: first.to_string(),
        last_name: last.to_string(),
        ..Default::default()
    }
    .into_patient()
    .unwrap()
}

#[tokio::test]
async fn save_then_load_patient() {
    let store = MemoryStore::new();
    let p = patient("Ada", "Lovelace");
    save_json(&store, &keys::patient(p.id), &p).await.unwrap();

    let loaded: Patient = load_json(&store, &keys::patient(p.id)).await.unwrap();
    assert_eq!(loaded.id, p.id);
    assert_eq!(loaded.full_name(), "Ada Lovelace");

    let stored = store.get(&keys::patient(p.id)).await.unwrap();
    assert_eq!(stored.content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn missing_history_is_none() {
    let store = MemoryStore::new();
    let history: Option<ClinicalHistory> =
        load_json_opt(&store, &keys::history(Uuid::new_v4())).await.unwrap();
    assert!(history.is_none());
}

#[tokio::test]
async fn load_all_filters_and_skips_corrupt_documents() {
    let store = MemoryStore::new();
    let a = patient("Ada", "Lovelace");
    let b = patient("Alan", "Turing");
    save_json(&store, &keys::patient(a.id), &a).await.unwrap();
    save_json(&store, &keys::patient(b.id), &b).await.unwrap();
    save_json(&store, &keys::history(a.id), &ClinicalHistory::empty(a.id))
        .await
        .unwrap();
    let broken = Uuid::new_v4();
    store
        .put(&keys::patient(broken), b"{not json".to_vec(), None)
        .await
        .unwrap();

    let patients: Vec<Patient> =
        load_all_json(&store, keys::PATIENTS_PREFIX, keys::is_patient_record)
            .await
            .unwrap();
    assert_eq!(patients.len(), 2);
}
