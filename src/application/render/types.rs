use thiserror::Error;

use crate::domain::documents::{DocumentKind, Fidelity};

/// What the pipeline does when a delegate's primary render fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Substitute the delegate's fallback document and report success.
    Fallback,
    /// Report the failure to the caller.
    Propagate,
}

/// Structured errors surfaced by the rendering pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Caller-supplied data failed a precondition. The message is shown to the caller as-is.
    #[error("{message}")]
    InvalidInput { message: String },
    /// The HTML converter could not process the input.
    #[error("html conversion failed: {message}")]
    Conversion { message: String },
    /// The workbook could not be assembled or packaged.
    #[error("workbook assembly failed: {message}")]
    Assembly { message: String },
    /// Anything else, including failed fallbacks and panicked render tasks.
    #[error("{message}")]
    Unexpected { message: String },
}

impl RenderError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    pub fn assembly(message: impl Into<String>) -> Self {
        Self::Assembly {
            message: message.into(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, RenderError::InvalidInput { .. })
    }
}

/// Bytes of a finished office file plus how they were produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub fidelity: Fidelity,
}

/// A document library wrapped behind a uniform render contract.
///
/// Implementations are immutable and shared across requests; every call owns
/// its own buffers. The pipeline calls `check` before `render`, and only calls
/// `render_fallback` when `failure_policy` returns [`FailurePolicy::Fallback`].
pub trait DocumentDelegate: Send + Sync {
    type Input: Send + Sync;

    fn kind(&self) -> DocumentKind;

    fn failure_policy(&self) -> FailurePolicy;

    /// Validate preconditions without touching the underlying library.
    fn check(&self, input: &Self::Input) -> Result<(), RenderError>;

    fn render(&self, input: &Self::Input) -> Result<Vec<u8>, RenderError>;

    fn render_fallback(&self, _input: &Self::Input) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::unexpected(format!(
            "{} renderer has no fallback document",
            self.kind().label()
        )))
    }
}
