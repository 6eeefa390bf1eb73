//! Task performer
//!
//! Executes one instruction end-to-end: acquire the attempt, POST the task
//! body to its webhook, and map the HTTP outcome to a lifecycle transition.
//!
//! Outcome mapping (status codes):
//!   - no response or >= 500: transport failure, reschedule (or fail once
//!     the retry ceiling is reached)
//!   - 202..=499: application-level failure, fail immediately, no retries
//!   - <= 201: success, complete
//!
//! The delivery races the shutdown flag. The race is biased toward the
//! response: an answer that already arrived is always evaluated, even when
//! shutdown was signalled while it was in flight. Only a still-pending
//! request is abandoned, leaving the row `in_progress` with its advanced
//! due date so a later worker re-acquires it.

use std::sync::Arc;

use domain::{DueFactory, Instruction, Task, TaskStatus};
use tracing::{debug, instrument, warn};

use crate::control::ControlFlag;
use crate::error::ApplicationError;
use crate::ports::{DeliveryOutcome, TaskStore, WebhookPort, WebhookRequest};
use crate::services::lifecycle::TaskLifecycle;

/// Executes single task attempts against their webhooks
pub struct TaskPerformer {
    store: Arc<dyn TaskStore>,
    webhook: Arc<dyn WebhookPort>,
    due_factory: DueFactory,
    max_task_errors: u32,
}

impl std::fmt::Debug for TaskPerformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPerformer")
            .field("max_task_errors", &self.max_task_errors)
            .finish_non_exhaustive()
    }
}

impl TaskPerformer {
    /// Create a performer over concrete collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn TaskStore>,
        webhook: Arc<dyn WebhookPort>,
        due_factory: DueFactory,
        max_task_errors: u32,
    ) -> Self {
        Self {
            store,
            webhook,
            due_factory,
            max_task_errors,
        }
    }

    /// Perform one attempt
    ///
    /// Never propagates errors: every failure either leaves the row
    /// `in_progress` for natural re-acquisition or is an explicit
    /// transition.
    #[instrument(skip(self, flag), fields(task_id = %instruction.task_id()))]
    pub async fn perform(&self, instruction: Instruction, flag: &ControlFlag) {
        if !flag.is_set() {
            return;
        }

        let mut lifecycle = TaskLifecycle::new(Arc::clone(&self.store), self.due_factory.clone());
        let snapshot = match lifecycle
            .acquire(instruction.task_id(), instruction.retry_count())
            .await
        {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "acquisition failed, leaving task for re-acquisition");
                return;
            }
        };

        let delivery = self.webhook.deliver(WebhookRequest::for_task(&snapshot));
        tokio::pin!(delivery);
        let outcome = tokio::select! {
            biased;
            outcome = &mut delivery => outcome,
            () = flag.cleared() => {
                debug!("shutdown while request in flight, abandoning attempt");
                return;
            }
        };

        if let Err(e) = self.settle(&mut lifecycle, &snapshot, outcome).await {
            warn!(error = %e, "failed to record task outcome");
        }
    }

    async fn settle(
        &self,
        lifecycle: &mut TaskLifecycle,
        snapshot: &Task,
        outcome: DeliveryOutcome,
    ) -> Result<TaskStatus, ApplicationError> {
        match outcome {
            DeliveryOutcome::Delivered(code) if code <= 201 => {
                debug!(code, "webhook accepted delivery");
                lifecycle.complete().await
            }
            DeliveryOutcome::Delivered(code) if code >= 500 => {
                debug!(code, "webhook server error");
                self.retry_or_fail(lifecycle, snapshot).await
            }
            DeliveryOutcome::Delivered(code) => {
                debug!(code, "webhook rejected delivery");
                lifecycle.fail().await
            }
            DeliveryOutcome::NoResponse(reason) => {
                debug!(%reason, "no response from webhook");
                self.retry_or_fail(lifecycle, snapshot).await
            }
        }
    }

    /// Reschedule a transport failure, unless the task has exhausted its
    /// error budget: too many retries, or a retry offset past the delay
    /// ceiling.
    async fn retry_or_fail(
        &self,
        lifecycle: &mut TaskLifecycle,
        snapshot: &Task,
    ) -> Result<TaskStatus, ApplicationError> {
        if snapshot.retry_count >= self.max_task_errors
            || self.due_factory.delay_exhausted(snapshot.retry_count)
        {
            warn!(
                retry_count = snapshot.retry_count,
                "retry ceiling reached, failing task"
            );
            lifecycle.fail().await
        } else {
            lifecycle.reschedule().await
        }
    }
}
