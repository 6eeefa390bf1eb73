//! Application services

mod access;
mod due_scanner;
mod enqueue;
mod lifecycle;
mod performer;
mod poller;

pub use access::{AccessDecision, TaskAccessPolicy};
pub use due_scanner::{DueScanner, DueScannerConfig};
pub use enqueue::{EnqueueRequest, EnqueueService};
pub use lifecycle::TaskLifecycle;
pub use performer::TaskPerformer;
pub use poller::{PollerConfig, WorkerPool};
