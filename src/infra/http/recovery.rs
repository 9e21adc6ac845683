//! Panic recovery for the router.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::application::error::HttpError;

const SOURCE: &str = "infra::http::recovery::catch_panic";

pub(crate) type Panic = Box<dyn Any + Send + 'static>;

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic type")
}

/// Response for a panic that escaped a handler; used by `CatchPanicLayer::custom`.
pub(crate) fn catch_panic(payload: Panic) -> Response {
    let message = panic_message(payload.as_ref());

    error!(
        target = "docrender::http::recovery",
        message = %message,
        "service panic"
    );

    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        format!("panic: {message}"),
    )
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_readable() {
        let owned: Panic = Box::new(String::from("owned message"));
        let borrowed: Panic = Box::new("static message");
        let opaque: Panic = Box::new(7_u8);

        assert_eq!(panic_message(owned.as_ref()), "owned message");
        assert_eq!(panic_message(borrowed.as_ref()), "static message");
        assert_eq!(panic_message(opaque.as_ref()), "unknown panic type");
    }

    #[test]
    fn caught_panics_are_500_envelopes() {
        let response = catch_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
