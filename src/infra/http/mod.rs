pub mod api;
mod middleware;
mod recovery;

pub use api::{ApiState, RENDER_FIDELITY_HEADER, build_api_router};
pub use middleware::RequestContext;

use axum::{Router, extract::DefaultBodyLimit, middleware as axum_middleware};
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::LimitSettings;

/// The service router: API routes wrapped in the shared HTTP layers.
pub fn build_router(state: ApiState, limits: &LimitSettings) -> Router {
    with_http_layers(build_api_router(state), limits)
}

/// Apply body limit, panic recovery, response logging and request ids.
///
/// Layers run outermost-last: the request id is set before the logger reads
/// it, and the logger sees the 500 produced for a caught panic.
pub fn with_http_layers(router: Router, limits: &LimitSettings) -> Router {
    router
        .layer(DefaultBodyLimit::max(limits.max_request_bytes.get()))
        .layer(CatchPanicLayer::custom(recovery::catch_panic))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
