//! Due scanner background task
//!
//! Safety net that re-publishes instructions for overdue tasks. The broker
//! channel can lose work in two ways: a push that fails after the store
//! insert, and an attempt orphaned between acquisition and its terminal
//! transition (crash, shutdown). The scanner periodically re-pushes an
//! instruction for every non-terminal task whose due date has passed.
//! Duplicates are harmless: acquisition succeeds at most once per
//! `(task_id, retry_count)` pair.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::Instruction;
use tracing::{debug, info, instrument, warn};

use crate::control::ControlFlag;
use crate::error::ApplicationError;
use crate::ports::{InstructionBroker, TaskStore};

/// Tunables for the due scanner
#[derive(Debug, Clone)]
pub struct DueScannerConfig {
    /// Time between scans
    pub interval: Duration,
    /// Maximum tasks re-published per scan
    pub batch_limit: u32,
}

impl Default for DueScannerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            batch_limit: 100,
        }
    }
}

/// Re-publishes overdue tasks into the instruction broker
pub struct DueScanner {
    store: Arc<dyn TaskStore>,
    broker: Arc<dyn InstructionBroker>,
    config: DueScannerConfig,
}

impl std::fmt::Debug for DueScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DueScanner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DueScanner {
    /// Create a scanner over its collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn TaskStore>,
        broker: Arc<dyn InstructionBroker>,
        config: DueScannerConfig,
    ) -> Self {
        Self {
            store,
            broker,
            config,
        }
    }

    /// Run scans until the control flag clears
    pub async fn run(&self, flag: ControlFlag) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "due scanner started"
        );
        loop {
            tokio::select! {
                () = tokio::time::sleep(self.config.interval) => {}
                () = flag.cleared() => break,
            }
            if let Err(e) = self.scan_once().await {
                warn!(error = %e, "due scan failed");
            }
        }
        info!("due scanner stopped");
    }

    /// One scan: push an instruction for every overdue non-terminal task
    #[instrument(skip(self))]
    pub async fn scan_once(&self) -> Result<u32, ApplicationError> {
        let overdue = self
            .store
            .scan_overdue(Utc::now(), self.config.batch_limit)
            .await?;
        let mut published = 0u32;
        for task in overdue {
            let instruction = Instruction::new(task.id, task.retry_count);
            match self.broker.push(instruction).await {
                Ok(()) => published += 1,
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "republish failed");
                    break;
                }
            }
        }
        if published > 0 {
            debug!(published, "republished overdue instructions");
        }
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use domain::{AppId, Task, TaskId, TaskStatus};
    use mockall::predicate::eq;

    use super::*;
    use crate::ports::{MockInstructionBroker, MockTaskStore};

    fn overdue_task(id: i64, retry_count: u32, status: TaskStatus) -> Task {
        Task {
            id: TaskId::new(id),
            app_id: AppId::new(),
            url: "http://example.com/hook".to_string(),
            body: Vec::new(),
            charset: "utf-8".to_string(),
            enctype: "application/x-www-form-urlencoded".to_string(),
            headers: HashMap::new(),
            timeout: 20,
            status,
            retry_count,
            due: Utc::now() - chrono::Duration::seconds(30),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn republishes_each_overdue_task() {
        let mut store = MockTaskStore::new();
        store.expect_scan_overdue().returning(|_, _| {
            Ok(vec![
                overdue_task(1, 0, TaskStatus::Pending),
                overdue_task(2, 3, TaskStatus::InProgress),
            ])
        });
        let mut broker = MockInstructionBroker::new();
        broker
            .expect_push()
            .with(eq(Instruction::new(TaskId::new(1), 0)))
            .times(1)
            .returning(|_| Ok(()));
        broker
            .expect_push()
            .with(eq(Instruction::new(TaskId::new(2), 3)))
            .times(1)
            .returning(|_| Ok(()));

        let scanner = DueScanner::new(
            Arc::new(store),
            Arc::new(broker),
            DueScannerConfig::default(),
        );
        assert_eq!(scanner.scan_once().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_scan_publishes_nothing() {
        let mut store = MockTaskStore::new();
        store.expect_scan_overdue().returning(|_, _| Ok(Vec::new()));
        let mut broker = MockInstructionBroker::new();
        broker.expect_push().never();

        let scanner = DueScanner::new(
            Arc::new(store),
            Arc::new(broker),
            DueScannerConfig::default(),
        );
        assert_eq!(scanner.scan_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn broker_failure_stops_the_scan() {
        let mut store = MockTaskStore::new();
        store.expect_scan_overdue().returning(|_, _| {
            Ok(vec![
                overdue_task(1, 0, TaskStatus::Pending),
                overdue_task(2, 0, TaskStatus::Pending),
            ])
        });
        let mut broker = MockInstructionBroker::new();
        broker
            .expect_push()
            .times(1)
            .returning(|_| Err(ApplicationError::Broker("down".to_string())));

        let scanner = DueScanner::new(
            Arc::new(store),
            Arc::new(broker),
            DueScannerConfig::default(),
        );
        assert_eq!(scanner.scan_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn store_failure_surfaces() {
        let mut store = MockTaskStore::new();
        store
            .expect_scan_overdue()
            .returning(|_, _| Err(ApplicationError::Store("locked".to_string())));
        let broker = MockInstructionBroker::new();

        let scanner = DueScanner::new(
            Arc::new(store),
            Arc::new(broker),
            DueScannerConfig::default(),
        );
        assert!(scanner.scan_once().await.is_err());
    }
}
