//! Due-date arithmetic
//!
//! A task's due date is the instant after which it becomes eligible for
//! acquisition. On acquire the due date advances by the task's timeout; on
//! reschedule it is recomputed with a timeout of zero so the task becomes
//! re-due almost immediately. A retry-weighted offset spreads simultaneous
//! retries apart without randomness: the offset is a pure function of the
//! retry count, so replaying the same history yields the same schedule.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Computes task due dates from `(timeout, retry_count)`
#[derive(Debug, Clone)]
pub struct DueFactory {
    spread: f64,
    max_task_delay: Duration,
}

impl DueFactory {
    /// Per-retry growth applied to the deterministic retry offset
    pub const DEFAULT_SPREAD: f64 = 0.2;

    /// Create a factory whose retry offset is clamped at `max_task_delay`
    #[must_use]
    pub const fn new(max_task_delay: Duration) -> Self {
        Self {
            spread: Self::DEFAULT_SPREAD,
            max_task_delay,
        }
    }

    /// The retry-weighted offset alone: `(1 + spread)^n - 1` seconds,
    /// clamped at `max_task_delay`
    ///
    /// Zero for the first attempt, growing exponentially with each retry.
    #[must_use]
    pub fn retry_delay(&self, retry_count: u32) -> Duration {
        let raw = (1.0 + self.spread).powi(i32::try_from(retry_count).unwrap_or(i32::MAX)) - 1.0;
        // Clamp before converting: the power overflows to infinity long
        // before the ceiling does.
        let capped = raw.clamp(0.0, self.max_task_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Whether the offset for `retry_count` has hit the clamp ceiling
    ///
    /// Once the unclamped delay would exceed the ceiling, further retries
    /// buy no additional spacing; callers treat that as a retry ceiling.
    #[must_use]
    pub fn delay_exhausted(&self, retry_count: u32) -> bool {
        let raw = (1.0 + self.spread).powi(i32::try_from(retry_count).unwrap_or(i32::MAX)) - 1.0;
        raw > self.max_task_delay.as_secs_f64()
    }

    /// Compute a due instant: `now + timeout + retry_delay(retry_count)`
    #[must_use]
    pub fn due(&self, timeout_secs: u32, retry_count: u32) -> DateTime<Utc> {
        self.due_from(Utc::now(), timeout_secs, retry_count)
    }

    /// As [`Self::due`], anchored at an explicit instant
    #[must_use]
    pub fn due_from(
        &self,
        now: DateTime<Utc>,
        timeout_secs: u32,
        retry_count: u32,
    ) -> DateTime<Utc> {
        let offset = Duration::from_secs(u64::from(timeout_secs)) + self.retry_delay(retry_count);
        now + chrono::Duration::from_std(offset).unwrap_or_default()
    }
}
