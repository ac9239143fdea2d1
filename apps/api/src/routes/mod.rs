pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

/// Room for multipart boundaries and the job description on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 256 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/analyze-resume", post(handlers::handle_analyze_resume))
        .route("/analyze-text", post(handlers::handle_analyze_text))
        .route("/extract-resume", post(handlers::handle_extract_resume))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
