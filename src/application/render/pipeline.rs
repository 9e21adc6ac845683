use metrics::counter;
use tracing::{debug, warn};

use crate::domain::documents::{DocumentKind, Fidelity};

use super::types::{DocumentDelegate, FailurePolicy, RenderError, RenderedDocument};

pub(crate) const METRIC_RENDER_TOTAL: &str = "docrender_render_total";

/// Outcome label attached to every `docrender_render_total` increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Full,
    Fallback,
    Invalid,
    Error,
}

impl RenderOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderOutcome::Full => "full",
            RenderOutcome::Fallback => "fallback",
            RenderOutcome::Invalid => "invalid",
            RenderOutcome::Error => "error",
        }
    }
}

pub fn record_outcome(kind: DocumentKind, outcome: RenderOutcome) {
    counter!(
        METRIC_RENDER_TOTAL,
        "format" => kind.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Run a delegate: check preconditions, render, then apply its failure policy.
///
/// Never retries. A delegate with [`FailurePolicy::Fallback`] gets exactly one
/// fallback attempt; if that also fails the request fails.
pub fn render_with<D>(delegate: &D, input: &D::Input) -> Result<RenderedDocument, RenderError>
where
    D: DocumentDelegate + ?Sized,
{
    let kind = delegate.kind();

    if let Err(err) = delegate.check(input) {
        record_outcome(kind, RenderOutcome::Invalid);
        return Err(err);
    }

    let primary = match delegate.render(input) {
        Ok(bytes) => {
            debug!(
                target = "docrender::render",
                format = %kind,
                bytes = bytes.len(),
                "rendered document"
            );
            record_outcome(kind, RenderOutcome::Full);
            return Ok(RenderedDocument {
                bytes,
                fidelity: Fidelity::Full,
            });
        }
        Err(err) => err,
    };

    match delegate.failure_policy() {
        FailurePolicy::Propagate => {
            record_outcome(kind, RenderOutcome::Error);
            Err(primary)
        }
        FailurePolicy::Fallback => {
            warn!(
                target = "docrender::render",
                format = %kind,
                error = %primary,
                "primary render failed, producing fallback document"
            );
            match delegate.render_fallback(input) {
                Ok(bytes) => {
                    record_outcome(kind, RenderOutcome::Fallback);
                    Ok(RenderedDocument {
                        bytes,
                        fidelity: Fidelity::Fallback,
                    })
                }
                Err(fallback) => {
                    record_outcome(kind, RenderOutcome::Error);
                    Err(RenderError::unexpected(format!(
                        "fallback document failed after `{primary}`: {fallback}"
                    )))
                }
            }
        }
    }
}
