//! HTTP presentation layer for WebhookQ
//!
//! axum ingress: the enqueue endpoint, the task status endpoint, health
//! probes, and API key authentication middleware.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use middleware::{ApiKeyAuthLayer, AuthenticatedApp};
pub use routes::create_router;
pub use state::AppState;
