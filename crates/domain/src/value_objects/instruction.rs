//! Queue instruction - names one attempt of one task
//!
//! Instructions are the compact strings brokered between the enqueue side
//! and the workers: `"<task_id>:<retry_count>"`. An instruction identifies
//! a specific attempt, so duplicate or stale instructions are harmless --
//! acquisition matches on both fields and succeeds at most once per pair.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::TaskId;

/// A single attempt of a single task, as brokered between producers and
/// workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    task_id: TaskId,
    retry_count: u32,
}

impl Instruction {
    /// Create an instruction for a specific task attempt
    #[must_use]
    pub const fn new(task_id: TaskId, retry_count: u32) -> Self {
        Self {
            task_id,
            retry_count,
        }
    }

    /// Create the instruction for a freshly enqueued task (attempt zero)
    #[must_use]
    pub const fn initial(task_id: TaskId) -> Self {
        Self::new(task_id, 0)
    }

    /// The task this instruction names
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// The retry count the worker must present to acquire the task
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.task_id, self.retry_count)
    }
}

impl FromStr for Instruction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id_part, count_part) = s
            .split_once(':')
            .ok_or_else(|| DomainError::InvalidInstruction(s.to_string()))?;
        let task_id = TaskId::parse(id_part)
            .map_err(|_| DomainError::InvalidInstruction(s.to_string()))?;
        let retry_count = count_part
            .parse::<u32>()
            .map_err(|_| DomainError::InvalidInstruction(s.to_string()))?;
        Ok(Self {
            task_id,
            retry_count,
        })
    }
}
