//! cognita-render
//!
//! Presentation of a `ClinicalResponse`: HTML fragments for the web client
//! and a plain-text form for logs and prompt context.

pub mod error;
pub mod html;
pub mod text;

pub use html::render_response_html;
pub use text::render_response_text;
