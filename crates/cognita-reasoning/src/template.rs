//! Prompt templates with `{{placeholder}}` substitution.

use std::collections::HashMap;

use cognita_core::keys;
use cognita_core::models::stage::StageKind;
use cognita_storage::ObjectStore;
use tracing::{info, warn};

use crate::error::ReasoningError;
use crate::prompts;

/// Separates the system section from the user section in an override file.
const SECTION_SEPARATOR: &str = "---";

/// The system and user prompts for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Parse an override document: system prompt, a line containing only
    /// `---`, then the user prompt.
    pub fn parse(document: &str) -> Result<Self, ReasoningError> {
        let mut system = Vec::new();
        let mut user = Vec::new();
        let mut seen_separator = false;

        for line in document.lines() {
            if !seen_separator && line.trim() == SECTION_SEPARATOR {
                seen_separator = true;
                continue;
            }
            if seen_separator {
                user.push(line);
            } else {
                system.push(line);
            }
        }

        if !seen_separator {
            return Err(ReasoningError::TemplateFormat(format!(
                "missing '{SECTION_SEPARATOR}' line between system and user prompts"
            )));
        }

        let user = user.join("\n").trim().to_string();
        if user.is_empty() {
            return Err(ReasoningError::TemplateFormat(
                "user prompt is empty".to_string(),
            ));
        }

        Ok(Self {
            system: system.join("\n").trim().to_string(),
            user,
        })
    }

    /// True when either half contains the `{{name}}` placeholder.
    pub fn uses(&self, name: &str) -> bool {
        mentions(&self.system, name) || mentions(&self.user, name)
    }

    /// Render both halves with the same variables.
    pub fn render(&self, vars: &HashMap<&str, String>) -> Result<(String, String), ReasoningError> {
        Ok((render(&self.system, vars)?, render(&self.user, vars)?))
    }
}

/// Prompt templates for every stage.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: HashMap<StageKind, PromptTemplate>,
}

impl TemplateStore {
    /// The templates compiled into the binary.
    pub fn builtin() -> Self {
        let templates = StageKind::ALL
            .into_iter()
            .map(|stage| (stage, prompts::builtin(stage)))
            .collect();
        Self { templates }
    }

    pub fn with_override(mut self, stage: StageKind, template: PromptTemplate) -> Self {
        self.templates.insert(stage, template);
        self
    }

    pub fn get(&self, stage: StageKind) -> Result<&PromptTemplate, ReasoningError> {
        self.templates
            .get(&stage)
            .ok_or_else(|| ReasoningError::MissingTemplate(stage.to_string()))
    }

    /// Built-in templates, replaced stage by stage with any override found
    /// in storage. A malformed override is logged and ignored.
    pub async fn load_overrides(store: &dyn ObjectStore) -> Result<Self, ReasoningError> {
        let mut templates = Self::builtin();
        for stage in StageKind::ALL {
            let key = keys::prompt_override(stage);
            let output = match store.get(&key).await {
                Ok(output) => output,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            };
            let document = String::from_utf8_lossy(&output.body);
            match PromptTemplate::parse(&document) {
                Ok(template) => {
                    info!(stage = %stage, key = %key, "using prompt override");
                    templates = templates.with_override(stage, template);
                }
                Err(e) => warn!(stage = %stage, key = %key, error = %e, "ignoring prompt override"),
            }
        }
        Ok(templates)
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Substitute `{{name}}` placeholders.
///
/// Whitespace inside the braces is ignored. A well-formed placeholder with
/// no matching variable is an error. Anything else between braces (or an
/// unclosed `{{`) is copied through untouched, so JSON examples in a
/// prompt survive. Substituted values are not scanned again.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> Result<String, ReasoningError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };

        let name = after_open[..end].trim();
        if is_placeholder_name(name) {
            let value = vars
                .get(name)
                .ok_or_else(|| ReasoningError::MissingPlaceholder(name.to_string()))?;
            out.push_str(value);
            rest = &after_open[end + 2..];
        } else {
            // Not a placeholder: emit the opening brace and keep scanning
            // right after it.
            out.push('{');
            rest = &rest[start + 1..];
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Whether `render` would substitute `name` somewhere in `template`.
fn mentions(template: &str, wanted: &str) -> bool {
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            return false;
        };
        let name = after_open[..end].trim();
        if is_placeholder_name(name) {
            if name == wanted {
                return true;
            }
            rest = &after_open[end + 2..];
        } else {
            rest = &rest[start + 1..];
        }
    }
    false
}

fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
