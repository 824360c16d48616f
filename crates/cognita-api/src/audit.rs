use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// A structured audit event for a change to clinical records.
///
/// Emitted via `tracing` alongside the per-request log line from the audit
/// middleware. Never carries record contents, only identifiers.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub action: &'static str,
    pub resource_type: &'static str,
    pub resource_id: Uuid,
    pub patient_id: Uuid,
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(
        action: &'static str,
        resource_type: &'static str,
        resource_id: Uuid,
        patient_id: Uuid,
    ) -> Self {
        Self {
            action,
            resource_type,
            resource_id,
            patient_id,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn emit(&self) {
        let details = self
            .details
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        info!(
            audit.action = self.action,
            audit.resource_type = self.resource_type,
            audit.resource_id = %self.resource_id,
            audit.patient_id = %self.patient_id,
            audit.details = %details,
            "audit event"
        );
    }
}
