//! Task status endpoint
//!
//! `GET /tasks/{id}` returns the task's JSON representation. Access is
//! scoped to the owning application: a presented key must appear in the
//! task's access decision; an unauthenticated caller (fallback mode) must
//! be the owning application itself.

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use domain::{Task, TaskId, TaskStatus};
use serde::Serialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::middleware::AuthenticatedApp;
use crate::state::AppState;

/// JSON representation of a task
#[derive(Debug, Serialize)]
pub struct TaskView {
    pub id: i64,
    pub url: String,
    pub body: String,
    pub charset: String,
    pub enctype: String,
    pub headers: HashMap<String, String>,
    pub timeout: u32,
    pub status: TaskStatus,
    pub retry_count: u32,
    pub due: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            id: task.id.as_i64(),
            body: String::from_utf8_lossy(&task.body).into_owned(),
            url: task.url,
            charset: task.charset,
            enctype: task.enctype,
            headers: task.headers,
            timeout: task.timeout,
            status: task.status,
            retry_count: task.retry_count,
            due: task.due,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// `GET /tasks/{id}` handler
#[instrument(skip(state, app), fields(app_id = %app.app_id))]
pub async fn get_task(
    State(state): State<AppState>,
    Extension(app): Extension<AuthenticatedApp>,
    Path(id): Path<i64>,
) -> Result<Json<TaskView>, ApiError> {
    let task = state
        .task_store
        .get(TaskId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("task {id}")))?;

    match &app.api_key {
        Some(key) => {
            let decision = state.access_policy.decision_for(&task).await?;
            if !decision.permits(key) {
                return Err(ApiError::Forbidden("task belongs to another application".to_string()));
            }
        }
        None => {
            if task.app_id != app.app_id {
                return Err(ApiError::Forbidden("task belongs to another application".to_string()));
            }
        }
    }

    Ok(Json(TaskView::from(task)))
}
