//! Shared rendering seam for the document delegates.
//!
//! Each delegate declares its own [`FailurePolicy`]; [`render_with`] is the
//! only place that applies it, so the docx fallback and the xlsx propagation
//! rules cannot drift apart between endpoints.

mod pipeline;
mod types;

pub use pipeline::{RenderOutcome, record_outcome, render_with};
pub use types::{DocumentDelegate, FailurePolicy, RenderError, RenderedDocument};

pub(crate) use pipeline::METRIC_RENDER_TOTAL;
