//! Patient context block.
//!
//! Flattens everything recorded about a patient into the sectioned text
//! that every prompt receives as `{{patientContext}}`.

use std::fmt::Write;

use cognita_core::models::history::ClinicalHistory;
use cognita_core::models::patient::Patient;
use cognita_core::models::query::{ClinicalQuery, QueryStatus};
use cognita_core::models::test_result::TestResult;
use jiff::civil::Date;

/// Only the most recent answered questions are carried into the prompt.
pub const MAX_PRIOR_QUERIES: usize = 5;

const NONE_RECORDED: &str = "None recorded.";

/// Everything known about a patient at the time a question is asked.
#[derive(Debug, Clone)]
pub struct PatientSnapshot {
    pub patient: Patient,
    pub history: ClinicalHistory,
    pub test_results: Vec<TestResult>,
    pub prior_queries: Vec<ClinicalQuery>,
}

/// Build the text block describing `snapshot`. `today` anchors the
/// patient's age.
pub fn build_patient_context(snapshot: &PatientSnapshot, today: Date) -> String {
    let mut out = String::new();
    write_demographics(&mut out, &snapshot.patient, today);
    out.push('\n');
    write_history(&mut out, &snapshot.history);
    out.push('\n');
    write_test_results(&mut out, &snapshot.test_results);
    out.push('\n');
    write_prior_queries(&mut out, &snapshot.prior_queries);
    out.trim_end().to_string()
}

fn write_demographics(out: &mut String, patient: &Patient, today: Date) {
    out.push_str("## Patient\n");
    let _ = writeln!(out, "Name: {}", patient.full_name());
    match patient.age_on(today) {
        Some(age) => {
            let _ = writeln!(out, "Age: {age}");
        }
        None => out.push_str("Age: unknown\n"),
    }
    if let Some(gender) = non_blank(patient.gender.as_deref()) {
        let _ = writeln!(out, "Gender: {gender}");
    }
    if let Some(reason) = non_blank(patient.referral_reason.as_deref()) {
        let _ = writeln!(out, "Referral reason: {reason}");
    }
    if let Some(notes) = non_blank(patient.notes.as_deref()) {
        let _ = writeln!(out, "Clinician notes: {notes}");
    }
}

fn write_history(out: &mut String, history: &ClinicalHistory) {
    out.push_str("## Clinical history\n");
    if history.is_empty() {
        out.push_str(NONE_RECORDED);
        out.push('\n');
        return;
    }
    for (label, text) in history.sections() {
        let _ = writeln!(out, "{label}: {}", text.trim());
    }
    if !history.current_medications.is_empty() {
        let _ = writeln!(
            out,
            "Current medications: {}",
            history.current_medications.join(", ")
        );
    }
    if !history.allergies.is_empty() {
        let _ = writeln!(out, "Allergies: {}", history.allergies.join(", "));
    }
}

fn write_test_results(out: &mut String, results: &[TestResult]) {
    out.push_str("## Test results\n");
    if results.is_empty() {
        out.push_str(NONE_RECORDED);
        out.push('\n');
        return;
    }

    let mut sorted: Vec<&TestResult> = results.iter().collect();
    sorted.sort_by(|a, b| {
        b.administered_on
            .cmp(&a.administered_on)
            .then(b.created_at.cmp(&a.created_at))
    });

    for r in sorted {
        let _ = write!(out, "- {} ({})", r.instrument, r.administered_on);
        if let Some(score) = r.score {
            let _ = write!(out, ": score {score}");
        }
        if let Some(severity) = non_blank(r.severity.as_deref()) {
            let _ = write!(out, ", severity {severity}");
        }
        out.push('\n');
        if let Some(interpretation) = non_blank(r.interpretation.as_deref()) {
            let _ = writeln!(out, "  Interpretation: {interpretation}");
        }
        if has_subscales(&r.subscales) {
            let _ = writeln!(out, "  Subscales: {}", r.subscales);
        }
    }
}

fn write_prior_queries(out: &mut String, queries: &[ClinicalQuery]) {
    out.push_str("## Prior questions\n");

    let mut answered: Vec<&ClinicalQuery> = queries
        .iter()
        .filter(|q| q.status == QueryStatus::Complete && q.response.is_some())
        .collect();
    if answered.is_empty() {
        out.push_str(NONE_RECORDED);
        out.push('\n');
        return;
    }

    answered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    for q in answered.into_iter().take(MAX_PRIOR_QUERIES) {
        let date = q.created_at.strftime("%Y-%m-%d");
        let _ = writeln!(out, "- [{date}] Q: {}", q.question);
        if let Some(response) = &q.response {
            let _ = writeln!(out, "  A: {}", response.summary.trim());
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn has_subscales(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Object(map) => !map.is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use cognita_core::models::patient::PatientFields;
    use cognita_core::models::response::ClinicalResponse;
    use cognita_core::models::test_result::NewTestResult;
    use cognita_core::models::token_count::TokenUsage;
    use jiff::civil::date;
    use serde_json::json;

    use super::*;

    fn snapshot() -> PatientSnapshot {
        let patient = PatientFields {
            first_name: "Jordan".to_string(),
            last_name: "Reyes".to_string(),
            date_of_birth: Some(date(1994, 3, 2)),
            gender: Some("non-binary".to_string()),
            referral_reason: Some("low mood after job loss".to_string()),
            ..Default::default()
        }
        .into_patient()
        .unwrap();
        let history = ClinicalHistory::empty(patient.id);
        PatientSnapshot {
            patient,
            history,
            test_results: Vec::new(),
            prior_queries: Vec::new(),
        }
    }

    fn test_result(snapshot: &PatientSnapshot, instrument: &str, on: Date) -> TestResult {
        NewTestResult {
            instrument: instrument.to_string(),
            administered_on: on,
            score: Some(14.0),
            severity: Some("moderate".to_string()),
            interpretation: None,
            subscales: serde_json::Value::Null,
        }
        .into_result(snapshot.patient.id)
        .unwrap()
    }

    #[test]
    fn empty_record_marks_sections_as_none() {
        let ctx = build_patient_context(&snapshot(), date(2025, 1, 1));
        assert!(ctx.starts_with("## Patient\nName: Jordan Reyes\nAge: 30\n"));
        assert!(ctx.contains("Gender: non-binary"));
        assert!(ctx.contains("Referral reason: low mood after job loss"));
        assert_eq!(ctx.matches(NONE_RECORDED).count(), 3);
    }

    #[test]
    fn history_lists_only_filled_sections() {
        let mut s = snapshot();
        s.history.presenting_problem = "Persistent low mood".to_string();
        s.history.current_medications = vec!["sertraline 50mg".to_string(), "melatonin".to_string()];
        let ctx = build_patient_context(&s, date(2025, 1, 1));
        assert!(ctx.contains("Presenting problem: Persistent low mood"));
        assert!(ctx.contains("Current medications: sertraline 50mg, melatonin"));
        assert!(!ctx.contains("Family history"));
    }

    #[test]
    fn test_results_are_newest_first() {
        let mut s = snapshot();
        let old = test_result(&s, "PHQ-9", date(2024, 1, 10));
        let mut new = test_result(&s, "GAD-7", date(2024, 6, 1));
        new.subscales = json!({ "worry": 3 });
        s.test_results = vec![old, new];

        let ctx = build_patient_context(&s, date(2025, 1, 1));
        let gad = ctx.find("GAD-7 (2024-06-01)").unwrap();
        let phq = ctx.find("PHQ-9 (2024-01-10)").unwrap();
        assert!(gad < phq);
        assert!(ctx.contains(": score 14, severity moderate"));
        assert!(ctx.contains("Subscales: {\"worry\":3}"));
    }

    #[test]
    fn prior_queries_keep_newest_answered_newest_first() {
        let mut s = snapshot();
        let mut queries = Vec::new();
        // Stored order is deliberately unrelated to creation order.
        for i in [3, 0, 6, 1, 5, 2, 4] {
            let mut q = ClinicalQuery::new(s.patient.id, &format!("question {i}"), "m").unwrap();
            q.created_at = jiff::Timestamp::from_second(1_735_689_600 + i * 3600).unwrap();
            q.complete(
                ClinicalResponse {
                    summary: format!("answer {i}"),
                    ..Default::default()
                },
                Vec::new(),
                TokenUsage::default(),
            );
            queries.push(q);
        }
        let mut pending = ClinicalQuery::new(s.patient.id, "still running", "m").unwrap();
        pending.created_at = jiff::Timestamp::from_second(1_735_689_600 + 100 * 3600).unwrap();
        queries.push(pending);
        s.prior_queries = queries;

        let ctx = build_patient_context(&s, date(2025, 1, 1));
        assert_eq!(ctx.matches("Q: question").count(), MAX_PRIOR_QUERIES);
        assert!(!ctx.contains("still running"));
        assert!(!ctx.contains("Q: question 0"));
        assert!(!ctx.contains("Q: question 1"));

        let positions: Vec<usize> = [6, 5, 4, 3, 2]
            .iter()
            .map(|i| ctx.find(&format!("Q: question {i}\n  A: answer {i}")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
