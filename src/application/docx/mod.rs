//! HTML to DOCX delegate.

mod convert;
mod writer;

use docrender_api_types::DocumentRenderRequest;

use crate::application::render::{DocumentDelegate, FailurePolicy, RenderError};
use crate::domain::documents::DocumentKind;

use self::convert::HtmlConverter;

pub use self::writer::FALLBACK_NOTICE;

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocxRenderConfig {
    /// Markup nested deeper than this is treated as unconvertible.
    pub max_nesting_depth: usize,
}

impl Default for DocxRenderConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

/// Converts an HTML fragment into a Word document, falling back to a
/// title-only document when the markup cannot be converted.
pub struct DocxRenderer {
    converter: HtmlConverter,
}

impl DocxRenderer {
    pub fn new(config: DocxRenderConfig) -> Self {
        Self {
            converter: HtmlConverter::new(config.max_nesting_depth),
        }
    }
}

impl Default for DocxRenderer {
    fn default() -> Self {
        Self::new(DocxRenderConfig::default())
    }
}

impl DocumentDelegate for DocxRenderer {
    type Input = DocumentRenderRequest;

    fn kind(&self) -> DocumentKind {
        DocumentKind::Docx
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Fallback
    }

    fn check(&self, input: &DocumentRenderRequest) -> Result<(), RenderError> {
        if input.html.is_empty() || input.title.is_empty() {
            return Err(RenderError::invalid_input("Missing html or title"));
        }
        Ok(())
    }

    fn render(&self, input: &DocumentRenderRequest) -> Result<Vec<u8>, RenderError> {
        let blocks = self.converter.convert(&input.html)?;
        writer::write_blocks(&blocks, &input.title).map_err(RenderError::conversion)
    }

    fn render_fallback(&self, input: &DocumentRenderRequest) -> Result<Vec<u8>, RenderError> {
        writer::fallback_document(&input.title).map_err(RenderError::unexpected)
    }
}
