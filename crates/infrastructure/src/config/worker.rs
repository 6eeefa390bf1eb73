//! Worker pool, polling and due scanner configuration

use std::time::Duration;

use application::{DueScannerConfig, PollerConfig};
use domain::DueFactory;
use serde::{Deserialize, Serialize};

use super::default_true;

/// Worker pool and adaptive polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Concurrent performer slots
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,
    /// Polling floor in milliseconds while instructions flow
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    /// Polling ceiling in milliseconds while the broker is empty
    #[serde(default = "default_max_empty_delay_ms")]
    pub max_empty_delay_ms: u64,
    /// Polling ceiling in milliseconds while the broker is erroring
    #[serde(default = "default_max_error_delay_ms")]
    pub max_error_delay_ms: u64,
    /// Idle backoff factor
    #[serde(default = "default_empty_multiplier")]
    pub empty_multiplier: f64,
    /// Error backoff factor (also the recovery divisor)
    #[serde(default = "default_error_multiplier")]
    pub error_multiplier: f64,
    /// How many times a task may error before it is failed
    #[serde(default = "default_max_task_errors")]
    pub max_task_errors: u32,
    /// Ceiling in seconds on the retry-weighted due offset
    #[serde(default = "default_max_task_delay_secs")]
    pub max_task_delay_secs: u64,
    /// How long a single broker pop may block, in milliseconds
    #[serde(default = "default_pop_timeout_ms")]
    pub pop_timeout_ms: u64,
    /// Drain mode: stop once the broker and pending set are both empty
    #[serde(default)]
    pub finish_on_empty: bool,
}

const fn default_max_tasks() -> usize {
    5
}

const fn default_min_delay_ms() -> u64 {
    200
}

const fn default_max_empty_delay_ms() -> u64 {
    1_600
}

const fn default_max_error_delay_ms() -> u64 {
    240_000
}

const fn default_empty_multiplier() -> f64 {
    2.0
}

const fn default_error_multiplier() -> f64 {
    4.0
}

const fn default_max_task_errors() -> u32 {
    100
}

const fn default_max_task_delay_secs() -> u64 {
    1_800
}

const fn default_pop_timeout_ms() -> u64 {
    1_000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_tasks: default_max_tasks(),
            min_delay_ms: default_min_delay_ms(),
            max_empty_delay_ms: default_max_empty_delay_ms(),
            max_error_delay_ms: default_max_error_delay_ms(),
            empty_multiplier: default_empty_multiplier(),
            error_multiplier: default_error_multiplier(),
            max_task_errors: default_max_task_errors(),
            max_task_delay_secs: default_max_task_delay_secs(),
            pop_timeout_ms: default_pop_timeout_ms(),
            finish_on_empty: false,
        }
    }
}

impl WorkerConfig {
    /// The poller configuration this worker config describes
    #[must_use]
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            max_tasks: self.max_tasks,
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_empty_delay: Duration::from_millis(self.max_empty_delay_ms),
            max_error_delay: Duration::from_millis(self.max_error_delay_ms),
            empty_multiplier: self.empty_multiplier,
            error_multiplier: self.error_multiplier,
            pop_timeout: Duration::from_millis(self.pop_timeout_ms),
            finish_on_empty: self.finish_on_empty,
        }
    }

    /// The due-date factory this worker config describes
    #[must_use]
    pub fn due_factory(&self) -> DueFactory {
        DueFactory::new(Duration::from_secs(self.max_task_delay_secs))
    }
}

/// Due scanner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Whether the scanner runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time between scans, in milliseconds
    #[serde(default = "default_scan_interval_ms")]
    pub interval_ms: u64,
    /// Maximum tasks re-published per scan
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,
}

const fn default_scan_interval_ms() -> u64 {
    5_000
}

const fn default_batch_limit() -> u32 {
    100
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_scan_interval_ms(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl ScannerConfig {
    /// The scanner configuration this config describes
    #[must_use]
    pub fn scanner_config(&self) -> DueScannerConfig {
        DueScannerConfig {
            interval: Duration::from_millis(self.interval_ms),
            batch_limit: self.batch_limit,
        }
    }
}
