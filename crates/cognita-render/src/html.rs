use cognita_core::models::response::{
    ClinicalResponse, DiagnosticConsideration, Reference, TreatmentSuggestion,
};
use serde::Serialize;
use tera::{Context, Tera};

use crate::error::RenderError;

// The `.html` suffix turns on Tera's autoescaping.
const TEMPLATE_NAME: &str = "clinical_response.html";
const TEMPLATE: &str = include_str!("../templates/clinical_response.html");

/// What the template sees: the response with treatments ordered and links
/// restricted to http(s).
#[derive(Serialize)]
struct ResponseView<'a> {
    summary: &'a str,
    diagnostic_considerations: &'a [DiagnosticConsideration],
    treatment_suggestions: Vec<&'a TreatmentSuggestion>,
    references: Vec<ReferenceView<'a>>,
    follow_up_questions: &'a [String],
    caveats: &'a [String],
}

#[derive(Serialize)]
struct ReferenceView<'a> {
    citation: &'a str,
    url: Option<&'a str>,
}

impl<'a> ReferenceView<'a> {
    fn new(r: &'a Reference) -> Self {
        let url = r
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| u.starts_with("https://") || u.starts_with("http://"));
        Self {
            citation: &r.citation,
            url,
        }
    }
}

/// Render a response as an HTML fragment (a single `<section>`).
///
/// All model-supplied text is escaped. Sections with no content are
/// omitted; the summary is always present.
pub fn render_response_html(response: &ClinicalResponse) -> Result<String, RenderError> {
    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
        .map_err(|e| RenderError::TemplateParse(e.to_string()))?;

    let mut treatments: Vec<&TreatmentSuggestion> = response.treatment_suggestions.iter().collect();
    // Stable: suggestions without a priority keep their relative order at the end.
    treatments.sort_by_key(|t| t.priority.map_or(u16::MAX, u16::from));

    let view = ResponseView {
        summary: &response.summary,
        diagnostic_considerations: &response.diagnostic_considerations,
        treatment_suggestions: treatments,
        references: response.references.iter().map(ReferenceView::new).collect(),
        follow_up_questions: &response.follow_up_questions,
        caveats: &response.caveats,
    };

    let context =
        Context::from_serialize(&view).map_err(|e| RenderError::TemplateRender(e.to_string()))?;
    Ok(tera.render(TEMPLATE_NAME, &context)?)
}
