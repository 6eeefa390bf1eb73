//! Enqueue endpoint
//!
//! `POST /?url=...&timeout=...` -- validates the query parameters, captures
//! the request body verbatim, and persists a pending task plus its initial
//! instruction. Responds `201 Created` with a Location header pointing at
//! the task's status resource.

use application::EnqueueRequest;
use axum::{
    Extension,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use domain::WebhookUrl;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::middleware::AuthenticatedApp;
use crate::state::AppState;

const INVALID_URL: &str = "You must provide a valid web hook URL.";
const INVALID_TIMEOUT: &str = "You must provide a valid integer timeout.";

/// Raw query parameters of the enqueue request
#[derive(Debug, Deserialize)]
pub struct EnqueueParams {
    /// Webhook URL (required)
    pub url: Option<String>,
    /// Per-attempt timeout in seconds (defaults from config)
    pub timeout: Option<String>,
}

impl EnqueueParams {
    /// Validate the webhook URL
    fn validated_url(&self) -> Result<String, ApiError> {
        self.url
            .as_deref()
            .ok_or_else(|| ApiError::BadRequest(INVALID_URL.to_string()))
            .and_then(|url| {
                WebhookUrl::new(url).map_err(|_| ApiError::BadRequest(INVALID_URL.to_string()))
            })
            .map(WebhookUrl::into_string)
    }

    /// Validate the timeout, falling back to the configured default
    fn validated_timeout(&self, default_timeout: u32) -> Result<u32, ApiError> {
        match self.timeout.as_deref() {
            None => Ok(default_timeout),
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ApiError::BadRequest(INVALID_TIMEOUT.to_string())),
        }
    }
}

/// `POST /` handler
#[instrument(skip_all, fields(app_id = %app.app_id))]
pub async fn enqueue_task(
    State(state): State<AppState>,
    Extension(app): Extension<AuthenticatedApp>,
    Query(params): Query<EnqueueParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let url = params.validated_url()?;
    let timeout = params.validated_timeout(state.default_timeout)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let request_headers: Vec<(String, String)> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let id = state
        .enqueue
        .enqueue(app.app_id, EnqueueRequest {
            url,
            timeout,
            body: body.to_vec(),
            content_type,
            headers: request_headers,
        })
        .await?;

    let location = format!("/tasks/{id}");
    debug!(task_id = %id, "task enqueued");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        (),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(url: Option<&str>, timeout: Option<&str>) -> EnqueueParams {
        EnqueueParams {
            url: url.map(String::from),
            timeout: timeout.map(String::from),
        }
    }

    #[test]
    fn missing_url_is_rejected_with_message() {
        let err = params(None, None).validated_url().unwrap_err();
        assert!(err.to_string().contains(INVALID_URL));
    }

    #[test]
    fn non_url_is_rejected() {
        assert!(params(Some("not a url"), None).validated_url().is_err());
        assert!(params(Some(""), None).validated_url().is_err());
    }

    #[test]
    fn http_urls_are_accepted() {
        assert_eq!(
            params(Some("http://example.com/hook"), None)
                .validated_url()
                .unwrap(),
            "http://example.com/hook"
        );
        assert!(
            params(Some("https://example.com:8443/a/b?c=d"), None)
                .validated_url()
                .is_ok()
        );
    }

    #[test]
    fn timeout_defaults_when_absent() {
        assert_eq!(params(None, None).validated_timeout(20).unwrap(), 20);
    }

    #[test]
    fn timeout_parses_integers() {
        assert_eq!(params(None, Some("45")).validated_timeout(20).unwrap(), 45);
        assert_eq!(params(None, Some("0")).validated_timeout(20).unwrap(), 0);
    }

    #[test]
    fn bad_timeout_is_rejected_with_message() {
        for raw in ["abc", "1.5", "-3", ""] {
            let err = params(None, Some(raw)).validated_timeout(20).unwrap_err();
            assert!(err.to_string().contains(INVALID_TIMEOUT), "{raw}");
        }
    }
}
