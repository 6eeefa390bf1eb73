//! Task lifecycle manager
//!
//! Encapsulates the acquire / reschedule / complete / fail transitions for
//! one task attempt. `acquire` performs the transactional
//! get-and-increment: the store's conditional update matches both the task
//! id and the caller's expected retry count, so duplicate instructions for
//! the same `(id, retry_count)` pair produce exactly one successful
//! acquisition.
//!
//! Between `acquire` and the terminal call the manager holds the snapshot
//! taken at acquisition; every later write uses the snapshot's
//! (post-increment) retry count as its predicate, so a worker that lost the
//! attempt can never overwrite the winner's transition.

use std::sync::Arc;

use domain::{DueFactory, Task, TaskId, TaskStatus};
use tracing::debug;

use crate::error::ApplicationError;
use crate::ports::{TaskChanges, TaskStore};

/// Per-attempt state machine over the task store
pub struct TaskLifecycle {
    store: Arc<dyn TaskStore>,
    due_factory: DueFactory,
    snapshot: Option<Task>,
}

impl std::fmt::Debug for TaskLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLifecycle")
            .field("task_id", &self.snapshot.as_ref().map(|t| t.id))
            .finish_non_exhaustive()
    }
}

impl TaskLifecycle {
    /// Create a lifecycle manager for a single attempt
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>, due_factory: DueFactory) -> Self {
        Self {
            store,
            due_factory,
            snapshot: None,
        }
    }

    /// The snapshot taken at acquisition, if this attempt holds one
    #[must_use]
    pub const fn snapshot(&self) -> Option<&Task> {
        self.snapshot.as_ref()
    }

    /// Atomically acquire the attempt named by `(id, expected_retry_count)`
    ///
    /// On success the row moves to `in_progress` with the retry count
    /// incremented and the due date advanced by the task's timeout, and the
    /// post-increment snapshot is returned. Returns `None` if no row
    /// matches -- another worker already took this attempt, or the task has
    /// advanced past it.
    pub async fn acquire(
        &mut self,
        id: TaskId,
        expected_retry_count: u32,
    ) -> Result<Option<Task>, ApplicationError> {
        let Some(task) = self.store.get(id).await? else {
            return Ok(None);
        };
        if task.retry_count != expected_retry_count {
            debug!(
                task_id = %id,
                expected = expected_retry_count,
                actual = task.retry_count,
                "stale instruction, task has advanced"
            );
            return Ok(None);
        }

        let new_retry_count = expected_retry_count + 1;
        let due = self.due_factory.due(task.timeout, new_retry_count);
        let updated = self
            .store
            .conditional_update(id, expected_retry_count, TaskChanges {
                status: Some(TaskStatus::InProgress),
                due: Some(due),
                retry_count: Some(new_retry_count),
            })
            .await?;
        if updated == 0 {
            debug!(task_id = %id, retry_count = expected_retry_count, "lost acquisition race");
            return Ok(None);
        }

        let mut snapshot = task;
        snapshot.retry_count = new_retry_count;
        snapshot.status = TaskStatus::InProgress;
        snapshot.due = due;
        self.snapshot = Some(snapshot.clone());
        Ok(Some(snapshot))
    }

    /// Make the acquired task immediately re-due, status back to `pending`
    ///
    /// The retry-weighted offset accelerates the due date relative to the
    /// timeout-sized advance written at acquisition.
    pub async fn reschedule(&mut self) -> Result<TaskStatus, ApplicationError> {
        let snapshot = self.current_attempt()?;
        let due = self.due_factory.due(0, snapshot.retry_count);
        self.write(TaskChanges {
            status: Some(TaskStatus::Pending),
            due: Some(due),
            retry_count: None,
        })
        .await?;
        Ok(TaskStatus::Pending)
    }

    /// Flag the acquired task as completed
    pub async fn complete(&mut self) -> Result<TaskStatus, ApplicationError> {
        self.write(TaskChanges {
            status: Some(TaskStatus::Completed),
            due: None,
            retry_count: None,
        })
        .await?;
        Ok(TaskStatus::Completed)
    }

    /// Flag the acquired task as failed
    pub async fn fail(&mut self) -> Result<TaskStatus, ApplicationError> {
        self.write(TaskChanges {
            status: Some(TaskStatus::Failed),
            due: None,
            retry_count: None,
        })
        .await?;
        Ok(TaskStatus::Failed)
    }

    fn current_attempt(&self) -> Result<&Task, ApplicationError> {
        self.snapshot.as_ref().ok_or_else(|| {
            ApplicationError::InvalidOperation("no acquired task for this attempt".to_string())
        })
    }

    /// Conditional write keyed on the snapshot's post-increment retry count.
    /// A zero row count means another worker transitioned first; the write
    /// is silently dropped.
    async fn write(&self, changes: TaskChanges) -> Result<(), ApplicationError> {
        let snapshot = self.current_attempt()?;
        let updated = self
            .store
            .conditional_update(snapshot.id, snapshot.retry_count, changes)
            .await?;
        if updated == 0 {
            debug!(task_id = %snapshot.id, "transition dropped, task advanced concurrently");
        }
        Ok(())
    }
}
