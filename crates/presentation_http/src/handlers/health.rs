//! Health check handlers

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Status message reported while the server is up
pub const STATUS_RUNNING: &str = "Model API is running";

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Names accepted by `/clone` as `model_name`
    pub available_models: Vec<String>,
}

/// Liveness check - is the server running?
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: STATUS_RUNNING.to_string(),
        available_models: state.model_cache.names(),
    })
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub engine: EngineStatus,
}

/// Status of the conversion engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub name: String,
    pub available: bool,
}

/// Readiness check - can the engine be run?
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let available = state.engine.is_available().await;
    let status_code = if available {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(ReadinessResponse {
            ready: available,
            engine: EngineStatus {
                name: state.engine.name().to_string(),
                available,
            },
        }),
    )
}
