//! Route definitions

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        // Health and status endpoints
        .route("/", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        // Voice conversion
        .route("/clone", post(handlers::clone::clone_voice))
        // Audio and uploaded models exceed axum's 2 MB default
        .layer(DefaultBodyLimit::max(body_limit))
        // Attach state
        .with_state(state)
}
