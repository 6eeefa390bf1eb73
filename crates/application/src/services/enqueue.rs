//! Enqueue use case
//!
//! Turns a validated ingress request into a persisted `pending` task plus a
//! brokered instruction for attempt zero. The request body is captured
//! verbatim; charset and enctype come from the Content-Type header with
//! defaults; headers carrying the configured proxy prefix are stripped of
//! the prefix and forwarded to the webhook on every attempt.
//!
//! Insert and push are not atomic. A push failure after the insert is
//! logged and tolerated: the task row is already `pending` and due, so the
//! due scanner republishes it within one scan interval.

use std::collections::HashMap;
use std::sync::Arc;

use domain::{DEFAULT_CHARSET, DEFAULT_ENCTYPE, AppId, Instruction, NewTask, TaskId};
use tracing::{debug, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{InstructionBroker, TaskStore};

/// The pieces of an ingress request the enqueue flow consumes
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    /// Validated webhook URL
    pub url: String,
    /// Per-attempt HTTP timeout in seconds
    pub timeout: u32,
    /// Request body, verbatim
    pub body: Vec<u8>,
    /// Raw Content-Type header, if any
    pub content_type: Option<String>,
    /// All request headers as received (names lowercased by the server)
    pub headers: Vec<(String, String)>,
}

/// Persists tasks and publishes their initial instructions
pub struct EnqueueService {
    store: Arc<dyn TaskStore>,
    broker: Arc<dyn InstructionBroker>,
    proxy_header_prefix: String,
}

impl std::fmt::Debug for EnqueueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnqueueService")
            .field("proxy_header_prefix", &self.proxy_header_prefix)
            .finish_non_exhaustive()
    }
}

impl EnqueueService {
    /// Create the service over its collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn TaskStore>,
        broker: Arc<dyn InstructionBroker>,
        proxy_header_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            broker,
            proxy_header_prefix: proxy_header_prefix.into().to_ascii_lowercase(),
        }
    }

    /// Persist a task for `app_id` and publish its attempt-zero instruction
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn enqueue(
        &self,
        app_id: AppId,
        request: EnqueueRequest,
    ) -> Result<TaskId, ApplicationError> {
        let (enctype, charset) = parse_content_type(request.content_type.as_deref());
        let headers = self.passthrough_headers(&request.headers);

        let new_task = NewTask::new(app_id, request.url, request.timeout)
            .with_body(request.body)
            .with_charset(charset)
            .with_enctype(enctype)
            .with_headers(headers);
        let id = self.store.insert(new_task).await?;
        debug!(task_id = %id, "task persisted");

        if let Err(e) = self.broker.push(Instruction::initial(id)).await {
            // The row is pending and due; the due scanner republishes it.
            warn!(task_id = %id, error = %e, "instruction push failed after insert");
        }
        Ok(id)
    }

    /// Headers whose names carry the proxy prefix, with the prefix stripped
    fn passthrough_headers(&self, headers: &[(String, String)]) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                let lowered = name.to_ascii_lowercase();
                lowered
                    .strip_prefix(&self.proxy_header_prefix)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_string(), value.clone()))
            })
            .collect()
    }
}

/// Split a Content-Type header into `(enctype, charset)` with defaults
fn parse_content_type(raw: Option<&str>) -> (String, String) {
    let Some(raw) = raw else {
        return (DEFAULT_ENCTYPE.to_string(), DEFAULT_CHARSET.to_string());
    };
    let mut parts = raw.split(';');
    let enctype = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_ENCTYPE)
        .to_ascii_lowercase();
    let charset = parts
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            (key.trim().eq_ignore_ascii_case("charset"))
                .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
        })
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string());
    (enctype, charset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockInstructionBroker, MockTaskStore};

    fn request(content_type: Option<&str>, headers: Vec<(&str, &str)>) -> EnqueueRequest {
        EnqueueRequest {
            url: "http://example.com/hook".to_string(),
            timeout: 20,
            body: b"a=1&b=2".to_vec(),
            content_type: content_type.map(String::from),
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    fn service(store: MockTaskStore, broker: MockInstructionBroker) -> EnqueueService {
        EnqueueService::new(Arc::new(store), Arc::new(broker), "X-Hook-")
    }

    #[test]
    fn content_type_defaults_when_absent() {
        let (enctype, charset) = parse_content_type(None);
        assert_eq!(enctype, "application/x-www-form-urlencoded");
        assert_eq!(charset, "utf-8");
    }

    #[test]
    fn content_type_with_charset() {
        let (enctype, charset) = parse_content_type(Some("application/json; charset=ISO-8859-1"));
        assert_eq!(enctype, "application/json");
        assert_eq!(charset, "iso-8859-1");
    }

    #[test]
    fn content_type_without_charset_keeps_default() {
        let (enctype, charset) = parse_content_type(Some("text/plain"));
        assert_eq!(enctype, "text/plain");
        assert_eq!(charset, "utf-8");
    }

    #[test]
    fn content_type_with_quoted_charset() {
        let (_, charset) = parse_content_type(Some(r#"text/html; charset="utf-16""#));
        assert_eq!(charset, "utf-16");
    }

    #[tokio::test]
    async fn enqueue_persists_and_publishes() {
        let mut store = MockTaskStore::new();
        store
            .expect_insert()
            .withf(|task| {
                task.url == "http://example.com/hook"
                    && task.timeout == 20
                    && task.body == b"a=1&b=2"
                    && task.enctype == "application/x-www-form-urlencoded"
            })
            .times(1)
            .returning(|_| Ok(TaskId::new(7)));
        let mut broker = MockInstructionBroker::new();
        broker
            .expect_push()
            .withf(|instruction| instruction.to_string() == "7:0")
            .times(1)
            .returning(|_| Ok(()));

        let id = service(store, broker)
            .enqueue(AppId::new(), request(None, vec![]))
            .await
            .unwrap();
        assert_eq!(id, TaskId::new(7));
    }

    #[tokio::test]
    async fn proxy_headers_are_stripped_and_forwarded() {
        let mut store = MockTaskStore::new();
        store
            .expect_insert()
            .withf(|task| {
                task.headers.len() == 2
                    && task.headers.get("token").map(String::as_str) == Some("abc")
                    && task.headers.get("trace-id").map(String::as_str) == Some("xyz")
            })
            .times(1)
            .returning(|_| Ok(TaskId::new(1)));
        let mut broker = MockInstructionBroker::new();
        broker.expect_push().returning(|_| Ok(()));

        service(store, broker)
            .enqueue(
                AppId::new(),
                request(None, vec![
                    ("x-hook-token", "abc"),
                    ("x-hook-trace-id", "xyz"),
                    ("content-length", "7"),
                    ("authorization", "Bearer k"),
                ]),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn push_failure_is_tolerated() {
        let mut store = MockTaskStore::new();
        store.expect_insert().returning(|_| Ok(TaskId::new(3)));
        let mut broker = MockInstructionBroker::new();
        broker
            .expect_push()
            .returning(|_| Err(ApplicationError::Broker("down".to_string())));

        // The task is persisted; the scanner takes over publication.
        let id = service(store, broker)
            .enqueue(AppId::new(), request(None, vec![]))
            .await
            .unwrap();
        assert_eq!(id, TaskId::new(3));
    }

    #[tokio::test]
    async fn store_failure_surfaces() {
        let mut store = MockTaskStore::new();
        store
            .expect_insert()
            .returning(|_| Err(ApplicationError::Store("full".to_string())));
        let mut broker = MockInstructionBroker::new();
        broker.expect_push().never();

        assert!(
            service(store, broker)
                .enqueue(AppId::new(), request(None, vec![]))
                .await
                .is_err()
        );
    }
}
