//! Task entity - a persisted webhook delivery job
//!
//! A task is created `pending` with a due date of "now", acquired by a
//! worker (which moves it to `in_progress` and bumps its retry count), and
//! finally completed, failed, or rescheduled back to `pending`. The retry
//! count only ever grows; `completed` and `failed` are terminal.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{AppId, TaskId};

/// Charset assumed when the enqueue request carries none
pub const DEFAULT_CHARSET: &str = "utf-8";

/// MIME type assumed when the enqueue request carries none
pub const DEFAULT_ENCTYPE: &str = "application/x-www-form-urlencoded";

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting to be acquired by a worker
    Pending,
    /// A worker intends to deliver this attempt
    InProgress,
    /// Webhook accepted the delivery
    Completed,
    /// Delivery failed terminally (application error or retry ceiling)
    Failed,
}

impl TaskStatus {
    /// Check if this status is terminal (no further transitions)
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if this task can still be acquired or rescheduled
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown status: {s}")),
        }
    }
}

/// A webhook delivery task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier
    pub id: TaskId,
    /// Owning application (authorization scope)
    pub app_id: AppId,
    /// Absolute webhook URL, immutable after creation
    pub url: String,
    /// Request body captured verbatim at enqueue time
    pub body: Vec<u8>,
    /// Text encoding the body is declared in
    pub charset: String,
    /// MIME type without parameters
    pub enctype: String,
    /// Pass-through headers forwarded to the webhook
    pub headers: HashMap<String, String>,
    /// Per-attempt HTTP timeout in seconds
    pub timeout: u32,
    /// Current status
    pub status: TaskStatus,
    /// Number of acquisitions so far; never decreases
    pub retry_count: u32,
    /// Instant after which a pending task is eligible for acquisition
    pub due: DateTime<Utc>,
    /// When this task was created
    pub created_at: DateTime<Utc>,
    /// When this task was last updated
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Render the Content-Type header sent to the webhook
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("{}; charset={}", self.enctype, self.charset)
    }

    /// Check if this task is eligible for acquisition
    #[must_use]
    pub fn is_due(&self) -> bool {
        self.status.is_active() && Utc::now() >= self.due
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "task {} -> {} ({}, retry {})",
            self.id, self.url, self.status, self.retry_count
        )
    }
}

/// Creation parameters for a task
///
/// The store assigns the id, initial status (`pending`), retry count (0),
/// due date (creation time) and timestamps.
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Owning application
    pub app_id: AppId,
    /// Absolute webhook URL
    pub url: String,
    /// Request body captured verbatim
    pub body: Vec<u8>,
    /// Text encoding of the body
    pub charset: String,
    /// MIME type without parameters
    pub enctype: String,
    /// Pass-through headers
    pub headers: HashMap<String, String>,
    /// Per-attempt HTTP timeout in seconds
    pub timeout: u32,
}

impl NewTask {
    /// Create task parameters with default charset and enctype
    #[must_use]
    pub fn new(app_id: AppId, url: impl Into<String>, timeout: u32) -> Self {
        Self {
            app_id,
            url: url.into(),
            body: Vec::new(),
            charset: DEFAULT_CHARSET.to_string(),
            enctype: DEFAULT_ENCTYPE.to_string(),
            headers: HashMap::new(),
            timeout,
        }
    }

    /// Set the request body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the body charset
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Set the MIME type
    #[must_use]
    pub fn with_enctype(mut self, enctype: impl Into<String>) -> Self {
        self.enctype = enctype.into();
        self
    }

    /// Set the pass-through headers
    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(status: TaskStatus, due: DateTime<Utc>) -> Task {
        Task {
            id: TaskId::new(1),
            app_id: AppId::new(),
            url: "http://example.com/hook".to_string(),
            body: b"a=1".to_vec(),
            charset: DEFAULT_CHARSET.to_string(),
            enctype: DEFAULT_ENCTYPE.to_string(),
            headers: HashMap::new(),
            timeout: 20,
            status,
            retry_count: 0,
            due,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn pending_and_in_progress_are_active() {
        assert!(TaskStatus::Pending.is_active());
        assert!(TaskStatus::InProgress.is_active());
        assert!(!TaskStatus::Completed.is_active());
        assert!(!TaskStatus::Failed.is_active());
    }

    #[test]
    fn completed_and_failed_are_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
    }

    #[test]
    fn status_display_roundtrip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let parsed: TaskStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn content_type_combines_enctype_and_charset() {
        let task = sample_task(TaskStatus::Pending, Utc::now());
        assert_eq!(
            task.content_type(),
            "application/x-www-form-urlencoded; charset=utf-8"
        );
    }

    #[test]
    fn overdue_pending_task_is_due() {
        let task = sample_task(TaskStatus::Pending, Utc::now() - chrono::Duration::seconds(5));
        assert!(task.is_due());
    }

    #[test]
    fn future_task_is_not_due() {
        let task = sample_task(TaskStatus::Pending, Utc::now() + chrono::Duration::hours(1));
        assert!(!task.is_due());
    }

    #[test]
    fn terminal_task_is_never_due() {
        let task = sample_task(
            TaskStatus::Completed,
            Utc::now() - chrono::Duration::hours(1),
        );
        assert!(!task.is_due());
    }

    #[test]
    fn new_task_defaults() {
        let new_task = NewTask::new(AppId::new(), "http://example.com", 20);
        assert_eq!(new_task.charset, "utf-8");
        assert_eq!(new_task.enctype, "application/x-www-form-urlencoded");
        assert!(new_task.body.is_empty());
        assert!(new_task.headers.is_empty());
    }

    #[test]
    fn new_task_builder_methods() {
        let mut headers = HashMap::new();
        headers.insert("Token".to_string(), "abc".to_string());
        let new_task = NewTask::new(AppId::new(), "http://example.com", 20)
            .with_body(b"payload".to_vec())
            .with_charset("latin-1")
            .with_enctype("application/json")
            .with_headers(headers);
        assert_eq!(new_task.body, b"payload");
        assert_eq!(new_task.charset, "latin-1");
        assert_eq!(new_task.enctype, "application/json");
        assert_eq!(new_task.headers.get("Token").map(String::as_str), Some("abc"));
    }

    #[test]
    fn serialization_roundtrip() {
        let task = sample_task(TaskStatus::Pending, Utc::now());
        let json = serde_json::to_string(&task).unwrap();
        let deserialized: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.id, task.id);
        assert_eq!(deserialized.status, task.status);
        assert_eq!(deserialized.body, task.body);
    }
}
