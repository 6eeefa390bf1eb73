//! Webhook delivery port

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use domain::Task;
#[cfg(test)]
use mockall::automock;

/// One outgoing POST to a webhook endpoint
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    /// Target URL
    pub url: String,
    /// Body bytes, sent verbatim
    pub body: Vec<u8>,
    /// Full Content-Type header value
    pub content_type: String,
    /// Pass-through headers
    pub headers: HashMap<String, String>,
    /// Total per-request deadline
    pub timeout: Duration,
}

impl WebhookRequest {
    /// Build the delivery request for an acquired task snapshot
    #[must_use]
    pub fn for_task(task: &Task) -> Self {
        Self {
            url: task.url.clone(),
            body: task.body.clone(),
            content_type: task.content_type(),
            headers: task.headers.clone(),
            timeout: Duration::from_secs(u64::from(task.timeout)),
        }
    }
}

/// What came back from the webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// A response arrived with this status code
    Delivered(u16),
    /// Nothing came back: connect failure, timeout, or transport error
    NoResponse(String),
}

/// Port for performing webhook POSTs
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebhookPort: Send + Sync {
    /// POST the request and report the outcome
    ///
    /// Never errors: every transport-level failure collapses into
    /// [`DeliveryOutcome::NoResponse`].
    async fn deliver(&self, request: WebhookRequest) -> DeliveryOutcome;
}
