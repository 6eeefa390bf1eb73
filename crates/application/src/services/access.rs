//! Task authorization
//!
//! A task may be read by any active API key belonging to its owning
//! application. The decision is synthesized fresh per request: deny-all,
//! overridden by an allow for each active key value. Nothing is memoized on
//! the task itself.

use std::sync::Arc;

use domain::Task;

use crate::error::ApplicationError;
use crate::ports::ApplicationStore;

/// A per-request authorization decision for one task
#[derive(Debug, Clone)]
pub struct AccessDecision {
    allowed_keys: Vec<String>,
}

impl AccessDecision {
    /// A decision that denies every caller
    #[must_use]
    pub const fn deny_all() -> Self {
        Self {
            allowed_keys: Vec::new(),
        }
    }

    /// Whether the presented key value is allowed
    #[must_use]
    pub fn permits(&self, key_value: &str) -> bool {
        self.allowed_keys.iter().any(|allowed| allowed == key_value)
    }
}

/// Synthesizes access decisions from the application store
pub struct TaskAccessPolicy {
    apps: Arc<dyn ApplicationStore>,
}

impl std::fmt::Debug for TaskAccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskAccessPolicy").finish_non_exhaustive()
    }
}

impl TaskAccessPolicy {
    /// Create a policy over the application store
    #[must_use]
    pub fn new(apps: Arc<dyn ApplicationStore>) -> Self {
        Self { apps }
    }

    /// Build the decision for a task: deny-all plus an allow for each
    /// active key of the owning application
    pub async fn decision_for(&self, task: &Task) -> Result<AccessDecision, ApplicationError> {
        let allowed_keys = self.apps.active_key_values(task.app_id).await?;
        Ok(AccessDecision { allowed_keys })
    }
}
