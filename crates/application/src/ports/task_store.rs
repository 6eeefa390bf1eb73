//! Task store port
//!
//! The store is the single owner of task rows and the only shared mutable
//! resource in the system. All mutation goes through the conditional update,
//! whose predicate is `(id, retry_count)` plus a non-terminal status; SQLite
//! row-level atomicity of that one statement is what serializes concurrent
//! acquisition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{NewTask, Task, TaskId, TaskStatus};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Field changes applied through [`TaskStore::conditional_update`]
///
/// Unset fields are left untouched; the store always refreshes the
/// `updated_at` timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    /// New status, if transitioning
    pub status: Option<TaskStatus>,
    /// New due instant, if recomputed
    pub due: Option<DateTime<Utc>>,
    /// New retry count (only ever the expected count plus one)
    pub retry_count: Option<u32>,
}

/// Port for task persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task: status `pending`, retry count 0, due now
    ///
    /// Returns the store-assigned id.
    async fn insert(&self, task: NewTask) -> Result<TaskId, ApplicationError>;

    /// Fetch a task by id
    async fn get(&self, id: TaskId) -> Result<Option<Task>, ApplicationError>;

    /// Apply `changes` iff the row's current retry count equals
    /// `expected_retry_count` and its status is non-terminal
    ///
    /// Returns the number of rows updated (0 or 1). Of any number of
    /// concurrent calls presenting the same expected count, exactly one
    /// observes 1.
    async fn conditional_update(
        &self,
        id: TaskId,
        expected_retry_count: u32,
        changes: TaskChanges,
    ) -> Result<u64, ApplicationError>;

    /// Non-terminal tasks with `due < before`, ordered by due date
    ///
    /// Feeds the due scanner; includes `in_progress` rows so attempts
    /// orphaned by a crash or shutdown become re-eligible.
    async fn scan_overdue(
        &self,
        before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Task>, ApplicationError>;

    /// Number of tasks currently `pending`
    async fn count_pending(&self) -> Result<u64, ApplicationError>;
}
