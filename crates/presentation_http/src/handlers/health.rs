//! Health and readiness endpoints

use axum::{Json, extract::State};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Liveness response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub pending_tasks: u64,
}

/// `GET /health` -- process is up
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /ready` -- the store answers a roundtrip
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    let pending_tasks = state.task_store.count_pending().await?;
    Ok(Json(ReadinessResponse {
        status: "ready",
        pending_tasks,
    }))
}
