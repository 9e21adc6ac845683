use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use docrender_api_types::{
    DocumentRenderRequest, HealthResponse, RenderResponse, WorkbookRenderRequest,
};
use tracing::error;

use crate::application::render::{
    DocumentDelegate, RenderError, RenderOutcome, RenderedDocument, record_outcome, render_with,
};
use crate::domain::documents::DocumentKind;
use crate::infra::http::recovery::panic_message;

use super::extract::Payload;
use super::state::ApiState;

/// Reports whether a DOCX came from the converter (`full`) or the fallback document.
pub const RENDER_FIDELITY_HEADER: HeaderName = HeaderName::from_static("x-render-fidelity");

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

pub async fn render_docx(
    State(state): State<ApiState>,
    Payload(request): Payload<DocumentRenderRequest>,
) -> Response {
    let outcome = render_blocking(Arc::clone(&state.docx), request).await;
    envelope(DocumentKind::Docx, outcome)
}

pub async fn render_xlsx(
    State(state): State<ApiState>,
    Payload(request): Payload<WorkbookRenderRequest>,
) -> Response {
    let outcome = render_blocking(Arc::clone(&state.xlsx), request).await;
    envelope(DocumentKind::Xlsx, outcome)
}

/// Run a delegate on the blocking pool; a panicking render becomes an unexpected error.
async fn render_blocking<D>(
    delegate: Arc<D>,
    input: D::Input,
) -> Result<RenderedDocument, RenderError>
where
    D: DocumentDelegate + 'static,
    D::Input: 'static,
{
    let kind = delegate.kind();
    match tokio::task::spawn_blocking(move || render_with(delegate.as_ref(), &input)).await {
        Ok(result) => result,
        Err(join_err) => {
            record_outcome(kind, RenderOutcome::Error);
            let detail = if join_err.is_panic() {
                let payload = join_err.into_panic();
                format!("render task panicked: {}", panic_message(payload.as_ref()))
            } else {
                format!("render task failed: {join_err}")
            };
            Err(RenderError::unexpected(detail))
        }
    }
}

/// The one place render envelopes are built.
fn envelope(kind: DocumentKind, outcome: Result<RenderedDocument, RenderError>) -> Response {
    match outcome {
        Ok(document) => {
            let data = BASE64.encode(&document.bytes);
            let mut response = Json(RenderResponse::success(data)).into_response();
            response.headers_mut().insert(
                RENDER_FIDELITY_HEADER,
                HeaderValue::from_static(document.fidelity.as_str()),
            );
            response
        }
        Err(err) => {
            let message = match &err {
                RenderError::InvalidInput { message } => message.clone(),
                other => format!("Unexpected error while rendering {}: {other}", kind.label()),
            };
            error!(
                target = "docrender::http::render",
                format = %kind,
                invalid_input = err.is_invalid_input(),
                error = %err,
                "render request failed"
            );
            Json(RenderResponse::failure(message)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    use super::*;
    use crate::application::render::FailurePolicy;
    use crate::domain::documents::Fidelity;

    struct Exploding;

    impl DocumentDelegate for Exploding {
        type Input = ();

        fn kind(&self) -> DocumentKind {
            DocumentKind::Xlsx
        }

        fn failure_policy(&self) -> FailurePolicy {
            FailurePolicy::Propagate
        }

        fn check(&self, _input: &()) -> Result<(), RenderError> {
            Ok(())
        }

        fn render(&self, _input: &()) -> Result<Vec<u8>, RenderError> {
            panic!("writer exploded");
        }
    }

    async fn body(response: Response) -> RenderResponse {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("envelope json")
    }

    #[tokio::test]
    async fn panicking_render_task_is_an_in_band_error() {
        let outcome = render_blocking(Arc::new(Exploding), ()).await;
        let response = envelope(DocumentKind::Xlsx, outcome);

        assert_eq!(response.status(), StatusCode::OK);
        let envelope = body(response).await;
        assert!(envelope.error);
        assert_eq!(envelope.data, None);
        let message = envelope.message.expect("message");
        assert!(
            message.starts_with("Unexpected error while rendering XLSX: "),
            "{message}"
        );
        assert!(message.contains("writer exploded"), "{message}");
    }

    #[tokio::test]
    async fn invalid_input_keeps_its_message() {
        let response = envelope(
            DocumentKind::Docx,
            Err(RenderError::invalid_input("Missing html or title")),
        );
        let envelope = body(response).await;
        assert_eq!(envelope.message.as_deref(), Some("Missing html or title"));
    }

    #[tokio::test]
    async fn success_carries_base64_and_fidelity() {
        let response = envelope(
            DocumentKind::Docx,
            Ok(RenderedDocument {
                bytes: b"PK\x03\x04".to_vec(),
                fidelity: Fidelity::Fallback,
            }),
        );

        assert_eq!(
            response.headers().get(&RENDER_FIDELITY_HEADER),
            Some(&HeaderValue::from_static("fallback"))
        );
        let envelope = body(response).await;
        assert!(!envelope.error);
        assert_eq!(envelope.data.as_deref(), Some("UEsDBA=="));
        assert_eq!(envelope.message, None);
    }
}
