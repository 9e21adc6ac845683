use std::sync::Arc;

use crate::application::docx::{DocxRenderConfig, DocxRenderer};
use crate::application::xlsx::XlsxRenderer;
use crate::config::RenderSettings;
use crate::infra::error::InfraError;

/// Immutable delegates shared by every request.
#[derive(Clone)]
pub struct ApiState {
    pub docx: Arc<DocxRenderer>,
    pub xlsx: Arc<XlsxRenderer>,
}

impl ApiState {
    pub fn new(docx: DocxRenderer, xlsx: XlsxRenderer) -> Self {
        Self {
            docx: Arc::new(docx),
            xlsx: Arc::new(xlsx),
        }
    }

    pub fn from_settings(render: &RenderSettings) -> Result<Self, InfraError> {
        let max_nesting_depth = usize::try_from(render.docx_max_nesting_depth.get())
            .map_err(|err| InfraError::configuration(format!("docx nesting depth: {err}")))?;

        Ok(Self::new(
            DocxRenderer::new(DocxRenderConfig { max_nesting_depth }),
            XlsxRenderer::new(),
        ))
    }
}

impl Default for ApiState {
    fn default() -> Self {
        Self::new(DocxRenderer::default(), XlsxRenderer::new())
    }
}
