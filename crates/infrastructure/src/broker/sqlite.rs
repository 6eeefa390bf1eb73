//! Durable SQLite-backed instruction broker
//!
//! Instructions are rows in an `instructions` table; a pop is a single
//! `DELETE ... RETURNING` of the oldest row, which SQLite executes
//! atomically, so concurrent consumers never receive the same row. The
//! blocking pop polls the table with a small exponential backoff until the
//! timeout elapses.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use application::error::ApplicationError;
use application::ports::InstructionBroker;
use domain::{Backoff, Instruction};

/// Poll floor between probes of an empty queue
const POLL_INITIAL: Duration = Duration::from_millis(10);
/// Poll ceiling between probes of an empty queue
const POLL_CEILING: Duration = Duration::from_millis(250);
/// Poll growth factor
const POLL_FACTOR: f64 = 1.5;

/// Durable instruction broker backed by SQLite (via sqlx)
#[derive(Clone)]
pub struct SqliteBroker {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBroker").finish_non_exhaustive()
    }
}

impl SqliteBroker {
    /// Create a broker over the shared pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomically take the oldest raw instruction, if any
    async fn take_oldest(&self) -> Result<Option<String>, ApplicationError> {
        sqlx::query_scalar(
            "DELETE FROM instructions
             WHERE id = (SELECT id FROM instructions ORDER BY id LIMIT 1)
             RETURNING instruction",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApplicationError::Broker(e.to_string()))
    }
}

#[async_trait]
impl InstructionBroker for SqliteBroker {
    async fn push(&self, instruction: Instruction) -> Result<(), ApplicationError> {
        sqlx::query("INSERT INTO instructions (instruction, created_at) VALUES ($1, $2)")
            .bind(instruction.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| ApplicationError::Broker(e.to_string()))?;
        debug!(%instruction, "instruction queued");
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<Instruction>, ApplicationError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut backoff = Backoff::new(POLL_INITIAL, POLL_CEILING);
        loop {
            if let Some(raw) = self.take_oldest().await? {
                match raw.parse::<Instruction>() {
                    Ok(instruction) => return Ok(Some(instruction)),
                    Err(e) => {
                        // Drop it and keep draining; the row is already gone.
                        warn!(raw = %raw, error = %e, "dropping malformed instruction");
                        continue;
                    }
                }
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let delay = backoff.next(POLL_FACTOR).min(deadline - now);
            tokio::time::sleep(delay).await;
        }
    }

    async fn depth(&self) -> Result<u64, ApplicationError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM instructions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ApplicationError::Broker(e.to_string()))?;
        #[allow(clippy::cast_sign_loss)]
        Ok(count as u64)
    }
}
