//! Entities - objects with identity and a lifecycle

mod application;
mod task;

pub use application::{ApiKey, Application};
pub use task::{DEFAULT_CHARSET, DEFAULT_ENCTYPE, NewTask, Task, TaskStatus};
