//! Application state shared across handlers

use std::sync::Arc;

use application::ports::TaskStore;
use application::{EnqueueService, TaskAccessPolicy};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Enqueue use case
    pub enqueue: Arc<EnqueueService>,
    /// Task store for status reads
    pub task_store: Arc<dyn TaskStore>,
    /// Per-request task authorization
    pub access_policy: Arc<TaskAccessPolicy>,
    /// Timeout applied when the enqueue request names none
    pub default_timeout: u32,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}
