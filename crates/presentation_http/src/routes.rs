//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and status endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        // Enqueue endpoint
        .route("/", post(handlers::enqueue::enqueue_task))
        // Task status endpoint
        .route("/tasks/{id}", get(handlers::tasks::get_task))
        // Attach state
        .with_state(state)
}
