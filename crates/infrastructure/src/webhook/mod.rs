//! Webhook HTTP client
//!
//! reqwest-based adapter for the delivery port. The client carries the
//! connect timeout and user agent from configuration; each request gets its
//! own total deadline from the task. Every transport-level failure
//! collapses into `DeliveryOutcome::NoResponse` -- the performer decides
//! what that means for the task.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument, warn};

use application::ports::{DeliveryOutcome, WebhookPort, WebhookRequest};

use crate::config::DeliveryConfig;

/// HTTP client that POSTs task bodies to their webhooks
#[derive(Debug, Clone)]
pub struct WebhookClient {
    inner: Client,
}

impl WebhookClient {
    /// Build a client from the delivery configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client cannot be built.
    pub fn new(config: &DeliveryConfig) -> Result<Self, reqwest::Error> {
        let inner = Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { inner })
    }

    fn header_map(request: &WebhookRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %name, "skipping invalid pass-through header"),
            }
        }
        if let Ok(value) = HeaderValue::from_str(&request.content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        headers
    }
}

#[async_trait]
impl WebhookPort for WebhookClient {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn deliver(&self, request: WebhookRequest) -> DeliveryOutcome {
        let headers = Self::header_map(&request);
        let result = self
            .inner
            .post(&request.url)
            .headers(headers)
            .timeout(request.timeout)
            .body(request.body)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(status, "webhook responded");
                DeliveryOutcome::Delivered(status)
            }
            Err(e) => {
                debug!(error = %e, "webhook request failed");
                DeliveryOutcome::NoResponse(e.to_string())
            }
        }
    }
}
