//! Task identifier

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique task identifier
///
/// Task ids are integers assigned by the task store on insert; they travel
/// over the wire inside queue instructions, so they stay numeric rather
/// than opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(i64);

impl TaskId {
    /// Wrap an existing store-assigned id
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the underlying integer
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Parse a task id from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid integer.
    pub fn parse(s: &str) -> Result<Self, std::num::ParseIntError> {
        Ok(Self(s.parse()?))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
