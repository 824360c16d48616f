use std::fmt::Write;

use cognita_core::models::response::ClinicalResponse;

/// Render a response as plain text with one heading per non-empty section.
pub fn render_response_text(response: &ClinicalResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "SUMMARY\n{}", response.summary.trim());

    if !response.diagnostic_considerations.is_empty() {
        out.push_str("\nDIAGNOSTIC CONSIDERATIONS\n");
        for d in &response.diagnostic_considerations {
            let _ = write!(out, "- {}", d.condition);
            if let Some(code) = &d.code {
                let _ = write!(out, " ({code})");
            }
            let _ = writeln!(out, " [likelihood: {}]", d.likelihood.label());
            if !d.rationale.is_empty() {
                let _ = writeln!(out, "  {}", d.rationale);
            }
        }
    }

    if !response.treatment_suggestions.is_empty() {
        out.push_str("\nTREATMENT SUGGESTIONS\n");
        for t in &response.treatment_suggestions {
            let _ = write!(out, "- {}", t.approach);
            if let Some(p) = t.priority {
                let _ = write!(out, " [priority {p}]");
            }
            out.push('\n');
            if !t.description.is_empty() {
                let _ = writeln!(out, "  {}", t.description);
            }
        }
    }

    write_list(&mut out, "FOLLOW-UP QUESTIONS", &response.follow_up_questions);

    if !response.references.is_empty() {
        out.push_str("\nREFERENCES\n");
        for r in &response.references {
            match &r.url {
                Some(url) => {
                    let _ = writeln!(out, "- {} <{url}>", r.citation);
                }
                None => {
                    let _ = writeln!(out, "- {}", r.citation);
                }
            }
        }
    }

    write_list(&mut out, "CAVEATS", &response.caveats);
    out.trim_end().to_string()
}

fn write_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{heading}");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}

#[cfg(test)]
mod tests {
    use cognita_core::models::response::{DiagnosticConsideration, Likelihood, Reference};

    use super::*;

    #[test]
    fn includes_only_populated_sections() {
        let r = ClinicalResponse {
            summary: "Likely adjustment disorder.".to_string(),
            diagnostic_considerations: vec![DiagnosticConsideration {
                condition: "Adjustment disorder".to_string(),
                code: Some("F43.2".to_string()),
                likelihood: Likelihood::High,
                rationale: String::new(),
                supporting_evidence: Vec::new(),
                ruling_out: Vec::new(),
            }],
            references: vec![Reference {
                citation: "DSM-5-TR".to_string(),
                url: None,
            }],
            ..Default::default()
        };
        let text = render_response_text(&r);
        assert!(text.starts_with("SUMMARY\nLikely adjustment disorder."));
        assert!(text.contains("- Adjustment disorder (F43.2) [likelihood: high]"));
        assert!(text.contains("REFERENCES\n- DSM-5-TR"));
        assert!(!text.contains("CAVEATS"));
        assert!(!text.contains("TREATMENT"));
    }
}
