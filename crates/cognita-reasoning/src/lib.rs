//! cognita-reasoning
//!
//! The clinical reasoning pipeline: prompt templates, the patient context
//! block, per-stage structured outputs with fallbacks, and the
//! [`ClinicalReasoningFlow`] that sequences the model calls.

pub mod context;
pub mod error;
pub mod extract;
pub mod flow;
pub mod prompts;
pub mod stages;
pub mod template;

pub use context::{PatientSnapshot, build_patient_context};
pub use error::ReasoningError;
pub use flow::{ClinicalReasoningFlow, FlowEvent, FlowOutcome};
pub use template::{PromptTemplate, TemplateStore};
