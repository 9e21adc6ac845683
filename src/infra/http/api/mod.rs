pub mod extract;
pub mod handlers;
pub mod state;

pub use handlers::RENDER_FIDELITY_HEADER;
pub use state::ApiState;

use axum::{
    Router,
    routing::{get, post},
};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/render-docx", post(handlers::render_docx))
        .route("/render-xlsx", post(handlers::render_xlsx))
        .with_state(state)
}
