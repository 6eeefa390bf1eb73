//! SQLite task store
//!
//! Implements the `TaskStore` port over sqlx. The conditional update is a
//! single UPDATE statement whose predicate covers the task id, the expected
//! retry count and a non-terminal status; SQLite executes it atomically, so
//! of any number of concurrent callers presenting the same expected count,
//! exactly one sees a row change. Terminal rows never match, which makes
//! `completed` and `failed` sticky at the only mutation gate.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use application::error::ApplicationError;
use application::ports::{TaskChanges, TaskStore};
use domain::{AppId, NewTask, Task, TaskId, TaskStatus};

use super::error::map_sqlx_error;

/// Row type for task queries
#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    app_id: String,
    url: String,
    body: Vec<u8>,
    charset: String,
    enctype: String,
    headers: String,
    timeout: i64,
    status: String,
    retry_count: i64,
    due: String,
    created_at: String,
    updated_at: String,
}

const TASK_COLUMNS: &str = "id, app_id, url, body, charset, enctype, headers, timeout, \
                            status, retry_count, due, created_at, updated_at";

impl TaskRow {
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn into_task(self) -> Task {
        let headers: HashMap<String, String> =
            serde_json::from_str(&self.headers).unwrap_or_default();
        Task {
            id: TaskId::new(self.id),
            app_id: AppId::parse(&self.app_id)
                .unwrap_or_else(|_| AppId::from_uuid(uuid::Uuid::nil())),
            url: self.url,
            body: self.body,
            charset: self.charset,
            enctype: self.enctype,
            headers,
            timeout: self.timeout as u32,
            status: self.status.parse().unwrap_or(TaskStatus::Pending),
            retry_count: self.retry_count as u32,
            due: parse_datetime(&self.due),
            created_at: parse_datetime(&self.created_at),
            updated_at: parse_datetime(&self.updated_at),
        }
    }
}

/// Task store backed by SQLite (via sqlx)
#[derive(Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteTaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTaskStore").finish_non_exhaustive()
    }
}

impl SqliteTaskStore {
    /// Create a new task store over the shared pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    #[instrument(skip(self, task), fields(url = %task.url))]
    #[allow(clippy::cast_possible_wrap)]
    async fn insert(&self, task: NewTask) -> Result<TaskId, ApplicationError> {
        let now = Utc::now().to_rfc3339();
        let headers_json = serde_json::to_string(&task.headers)
            .map_err(|e| ApplicationError::Internal(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO tasks (
                app_id, url, body, charset, enctype, headers, timeout,
                status, retry_count, due, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', 0, $8, $9, $10)",
        )
        .bind(task.app_id.to_string())
        .bind(&task.url)
        .bind(&task.body)
        .bind(&task.charset)
        .bind(&task.enctype)
        .bind(&headers_json)
        .bind(i64::from(task.timeout))
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let id = TaskId::new(result.last_insert_rowid());
        debug!(task_id = %id, "task inserted");
        Ok(id)
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, ApplicationError> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(row.map(TaskRow::into_task))
    }

    #[instrument(skip(self, changes), fields(task_id = %id))]
    async fn conditional_update(
        &self,
        id: TaskId,
        expected_retry_count: u32,
        changes: TaskChanges,
    ) -> Result<u64, ApplicationError> {
        let result = sqlx::query(
            "UPDATE tasks SET
                status = COALESCE($1, status),
                due = COALESCE($2, due),
                retry_count = COALESCE($3, retry_count),
                updated_at = $4
             WHERE id = $5
               AND retry_count = $6
               AND status IN ('pending', 'in_progress')",
        )
        .bind(changes.status.map(|s| s.to_string()))
        .bind(changes.due.map(|due| due.to_rfc3339()))
        .bind(changes.retry_count.map(i64::from))
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_i64())
        .bind(i64::from(expected_retry_count))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn scan_overdue(
        &self,
        before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Task>, ApplicationError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE status IN ('pending', 'in_progress') AND due < $1
             ORDER BY due ASC
             LIMIT $2"
        ))
        .bind(before.to_rfc3339())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(TaskRow::into_task).collect())
    }

    async fn count_pending(&self) -> Result<u64, ApplicationError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE status = 'pending'")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        #[allow(clippy::cast_sign_loss)]
        Ok(count as u64)
    }
}

/// Parse ISO8601 datetime string
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
