//! In-process FIFO instruction broker

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use application::error::ApplicationError;
use application::ports::InstructionBroker;
use domain::Instruction;

/// In-memory FIFO channel of instructions
///
/// Not durable: queued instructions are lost on restart. The due scanner
/// republishes them from the task store, so this broker is still safe for
/// single-node deployments.
#[derive(Debug, Default)]
pub struct MemoryBroker {
    queue: Mutex<VecDeque<Instruction>>,
    notify: Notify,
}

impl MemoryBroker {
    /// Create an empty broker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn try_pop(&self) -> Option<Instruction> {
        self.queue.lock().await.pop_front()
    }
}

#[async_trait]
impl InstructionBroker for MemoryBroker {
    async fn push(&self, instruction: Instruction) -> Result<(), ApplicationError> {
        self.queue.lock().await.push_back(instruction);
        self.notify.notify_one();
        debug!(%instruction, "instruction queued");
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<Instruction>, ApplicationError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking the queue so a push between
            // the check and the wait cannot be missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(instruction) = self.try_pop().await {
                return Ok(Some(instruction));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(self.try_pop().await);
            }
        }
    }

    async fn depth(&self) -> Result<u64, ApplicationError> {
        Ok(self.queue.lock().await.len() as u64)
    }
}
