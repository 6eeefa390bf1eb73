//! API key authentication middleware
//!
//! Resolves the Bearer token in the Authorization header to an active
//! application through the application store and injects the result into
//! request extensions as [`AuthenticatedApp`].
//!
//! When authentication is not required, requests without a usable key run
//! as the configured fallback application, so every task still has an
//! owning application. A key that is presented is always resolved, valid
//! or rejected -- there is no silent downgrade for bad credentials.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use application::ports::ApplicationStore;
use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    response::{IntoResponse, Response},
};
use domain::AppId;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::error::ApiError;

/// The application a request runs as, injected into request extensions
#[derive(Clone, Debug)]
pub struct AuthenticatedApp {
    /// Resolved application id
    pub app_id: AppId,
    /// The key value presented, if any
    pub api_key: Option<String>,
}

/// Layer that applies API key authentication
#[derive(Clone)]
pub struct ApiKeyAuthLayer {
    apps: Arc<dyn ApplicationStore>,
    fallback_app: Option<AppId>,
    excluded_paths: Vec<String>,
}

impl std::fmt::Debug for ApiKeyAuthLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuthLayer")
            .field("required", &self.fallback_app.is_none())
            .finish_non_exhaustive()
    }
}

impl ApiKeyAuthLayer {
    /// Require a valid API key on every request
    #[must_use]
    pub fn required(apps: Arc<dyn ApplicationStore>) -> Self {
        Self {
            apps,
            fallback_app: None,
            excluded_paths: vec!["/health".to_string(), "/ready".to_string()],
        }
    }

    /// Accept unauthenticated requests, attributing them to `fallback_app`
    #[must_use]
    pub fn with_fallback(apps: Arc<dyn ApplicationStore>, fallback_app: AppId) -> Self {
        Self {
            apps,
            fallback_app: Some(fallback_app),
            excluded_paths: vec!["/health".to_string(), "/ready".to_string()],
        }
    }

    /// Add paths that should be excluded from authentication
    #[must_use]
    pub fn exclude_paths(mut self, paths: Vec<String>) -> Self {
        self.excluded_paths.extend(paths);
        self
    }
}

impl<S> Layer<S> for ApiKeyAuthLayer {
    type Service = ApiKeyAuth<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyAuth {
            inner,
            apps: Arc::clone(&self.apps),
            fallback_app: self.fallback_app,
            excluded_paths: self.excluded_paths.clone(),
        }
    }
}

/// Middleware service for API key authentication
#[derive(Clone)]
pub struct ApiKeyAuth<S> {
    inner: S,
    apps: Arc<dyn ApplicationStore>,
    fallback_app: Option<AppId>,
    excluded_paths: Vec<String>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for ApiKeyAuth<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S> Service<Request> for ApiKeyAuth<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let apps = Arc::clone(&self.apps);
        let fallback_app = self.fallback_app;
        let excluded_paths = self.excluded_paths.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path();
            if excluded_paths.iter().any(|p| path.starts_with(p)) {
                return inner.call(req).await;
            }

            let bearer = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|header| header.strip_prefix("Bearer "))
                .map(str::to_string);

            match bearer {
                Some(token) => match apps.lookup_by_key(&token).await {
                    Ok(Some(app)) => {
                        debug!(app_id = %app.id, "API key resolved");
                        req.extensions_mut().insert(AuthenticatedApp {
                            app_id: app.id,
                            api_key: Some(token),
                        });
                        inner.call(req).await
                    }
                    Ok(None) => Ok(unauthorized_response("Invalid API key")),
                    Err(e) => {
                        warn!(error = %e, "API key lookup failed");
                        Ok(ApiError::ServiceUnavailable("authentication unavailable".to_string())
                            .into_response())
                    }
                },
                None => match fallback_app {
                    Some(app_id) => {
                        req.extensions_mut().insert(AuthenticatedApp {
                            app_id,
                            api_key: None,
                        });
                        inner.call(req).await
                    }
                    None => Ok(unauthorized_response(
                        "Missing Authorization header, expected Bearer token",
                    )),
                },
            }
        })
    }
}

fn unauthorized_response(message: &str) -> Response {
    ApiError::Unauthorized(message.to_string()).into_response()
}
