//! JSON body extractor that answers every rejection with the 400 envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Json, Request};
use axum::http::StatusCode;
use serde::de::DeserializeOwned;

use crate::application::error::HttpError;

const SOURCE: &str = "infra::http::api::extract";

pub const INVALID_PAYLOAD_MESSAGE: &str = "Invalid request payload";

/// Deserialized request body.
///
/// Malformed JSON, missing or mistyped fields, a wrong content type and
/// oversized bodies all surface as `400 Invalid request payload`; the
/// rejection text is kept in the attached report for the response log.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(reject(&rejection)),
        }
    }
}

fn reject(rejection: &JsonRejection) -> HttpError {
    HttpError::from_error(
        SOURCE,
        StatusCode::BAD_REQUEST,
        INVALID_PAYLOAD_MESSAGE,
        rejection,
    )
}
