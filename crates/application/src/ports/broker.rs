//! Instruction broker port
//!
//! A best-effort FIFO channel of instructions between the enqueue side and
//! the workers. Reordering and duplication are tolerated: acquisition is
//! idempotent per `(task_id, retry_count)` pair.

use std::time::Duration;

use async_trait::async_trait;
use domain::Instruction;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for the instruction channel
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InstructionBroker: Send + Sync {
    /// Append an instruction; non-blocking
    async fn push(&self, instruction: Instruction) -> Result<(), ApplicationError>;

    /// Take the oldest instruction, waiting up to `timeout` for one
    ///
    /// `Ok(None)` means the channel stayed empty for the whole timeout;
    /// `Err` means the broker itself is failing.
    async fn pop(&self, timeout: Duration) -> Result<Option<Instruction>, ApplicationError>;

    /// Number of queued instructions (diagnostics only)
    async fn depth(&self) -> Result<u64, ApplicationError>;
}
