use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// A patient's clinical history. One per patient, replaced wholesale on
/// update; a patient without a stored history has an empty one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClinicalHistory {
    pub patient_id: Uuid,
    #[serde(default)]
    pub presenting_problem: String,
    #[serde(default)]
    pub psychiatric_history: String,
    #[serde(default)]
    pub medical_history: String,
    #[serde(default)]
    pub family_history: String,
    #[serde(default)]
    pub social_history: String,
    #[serde(default)]
    pub substance_use: String,
    #[serde(default)]
    pub current_medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub updated_at: jiff::Timestamp,
}

impl ClinicalHistory {
    pub fn empty(patient_id: Uuid) -> Self {
        Self {
            patient_id,
            presenting_problem: String::new(),
            psychiatric_history: String::new(),
            medical_history: String::new(),
            family_history: String::new(),
            social_history: String::new(),
            substance_use: String::new(),
            current_medications: Vec::new(),
            allergies: Vec::new(),
            updated_at: jiff::Timestamp::now(),
        }
    }

    /// Replace the whole history with client-supplied fields.
    pub fn from_update(patient_id: Uuid, update: HistoryUpdate) -> Self {
        let clean = |items: Vec<String>| -> Vec<String> {
            items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            patient_id,
            presenting_problem: update.presenting_problem,
            psychiatric_history: update.psychiatric_history,
            medical_history: update.medical_history,
            family_history: update.family_history,
            social_history: update.social_history,
            substance_use: update.substance_use,
            current_medications: clean(update.current_medications),
            allergies: clean(update.allergies),
            updated_at: jiff::Timestamp::now(),
        }
    }

    /// Labelled narrative sections with content, in display order.
    pub fn sections(&self) -> Vec<(&'static str, &str)> {
        [
            ("Presenting problem", self.presenting_problem.as_str()),
            ("Psychiatric history", self.psychiatric_history.as_str()),
            ("Medical history", self.medical_history.as_str()),
            ("Family history", self.family_history.as_str()),
            ("Social history", self.social_history.as_str()),
            ("Substance use", self.substance_use.as_str()),
        ]
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections().is_empty()
            && self.current_medications.is_empty()
            && self.allergies.is_empty()
    }
}

/// Client-supplied history. Omitted fields are cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryUpdate {
    #[serde(default)]
    pub presenting_problem: String,
    #[serde(default)]
    pub psychiatric_history: String,
    #[serde(default)]
    pub medical_history: String,
    #[serde(default)]
    pub family_history: String,
    #[serde(default)]
    pub social_history: String,
    #[serde(default)]
    pub substance_use: String,
    #[serde(default)]
    pub current_medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_has_no_sections() {
        let h = ClinicalHistory::empty(Uuid::new_v4());
        assert!(h.is_empty());
        assert!(h.sections().is_empty());
    }

    #[test]
    fn update_drops_blank_list_entries() {
        let h = ClinicalHistory::from_update(
            Uuid::new_v4(),
            HistoryUpdate {
                family_history: "Mother: bipolar I".to_string(),
                current_medications: vec![" lithium ".to_string(), "  ".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(h.current_medications, vec!["lithium"]);
        assert_eq!(h.sections(), vec![("Family history", "Mother: bipolar I")]);
        assert!(!h.is_empty());
    }
}
