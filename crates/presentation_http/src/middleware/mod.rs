//! HTTP middleware

mod auth;

pub use auth::{ApiKeyAuthLayer, AuthenticatedApp};
