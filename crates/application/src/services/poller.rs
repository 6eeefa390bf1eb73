//! Worker pool with adaptive polling
//!
//! A single driver loop pops instructions from the broker and dispatches
//! each to a bounded pool of performers. The inter-poll delay adapts:
//! toward the floor while instructions flow, toward the idle ceiling while
//! the broker is empty, and toward a much higher ceiling while the broker
//! itself is erroring.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::control::ControlFlag;
use crate::error::ApplicationError;
use crate::ports::{InstructionBroker, TaskStore};
use crate::services::performer::TaskPerformer;

/// Tunables for the worker pool and its polling loop
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Concurrent performer slots
    pub max_tasks: usize,
    /// Polling floor while instructions flow
    pub min_delay: Duration,
    /// Polling ceiling while the broker is empty
    pub max_empty_delay: Duration,
    /// Polling ceiling while the broker is erroring
    pub max_error_delay: Duration,
    /// Idle backoff factor
    pub empty_multiplier: f64,
    /// Error backoff factor (also the recovery divisor)
    pub error_multiplier: f64,
    /// How long a single broker pop may block
    pub pop_timeout: Duration,
    /// Drain mode: stop once the broker and the pending set are both empty
    pub finish_on_empty: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_tasks: 5,
            min_delay: Duration::from_millis(200),
            max_empty_delay: Duration::from_millis(1600),
            max_error_delay: Duration::from_secs(240),
            empty_multiplier: 2.0,
            error_multiplier: 4.0,
            pop_timeout: Duration::from_secs(1),
            finish_on_empty: false,
        }
    }
}

/// Adaptive inter-poll delay
///
/// Yields the current delay, then steps it: hits divide it back toward the
/// floor, empty polls multiply it toward the idle ceiling, errors multiply
/// it toward the error ceiling.
#[derive(Debug)]
struct AdaptiveDelay {
    current: Duration,
    config: PollerConfig,
}

impl AdaptiveDelay {
    fn new(config: PollerConfig) -> Self {
        Self {
            current: config.min_delay,
            config,
        }
    }

    /// An instruction arrived: recover toward the floor
    fn on_hit(&mut self) -> Duration {
        self.current = self
            .current
            .div_f64(self.config.error_multiplier)
            .max(self.config.min_delay);
        self.current
    }

    /// Broker empty: back off toward the idle ceiling
    fn on_empty(&mut self) -> Duration {
        let delay = self.current.min(self.config.max_empty_delay);
        self.current = self
            .current
            .mul_f64(self.config.empty_multiplier)
            .min(self.config.max_empty_delay);
        delay
    }

    /// Broker error: back off toward the error ceiling
    fn on_error(&mut self) -> Duration {
        let delay = self.current.min(self.config.max_error_delay);
        self.current = self
            .current
            .mul_f64(self.config.error_multiplier)
            .min(self.config.max_error_delay);
        delay
    }
}

/// Bounded pool of performers fed by the adaptive poll loop
pub struct WorkerPool {
    broker: Arc<dyn InstructionBroker>,
    store: Arc<dyn TaskStore>,
    performer: Arc<TaskPerformer>,
    config: PollerConfig,
    flag: ControlFlag,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Create a pool over its collaborators
    #[must_use]
    pub fn new(
        broker: Arc<dyn InstructionBroker>,
        store: Arc<dyn TaskStore>,
        performer: Arc<TaskPerformer>,
        config: PollerConfig,
        flag: ControlFlag,
    ) -> Self {
        Self {
            broker,
            store,
            performer,
            config,
            flag,
        }
    }

    /// Drive the pool until shutdown, or until drained in
    /// `finish_on_empty` mode
    ///
    /// In drain mode the result reports whether the queue was cleared
    /// (`Ok`) or abandoned on a broker error (`Err`). Worker failures never
    /// surface here: each performer converts its own failures into task
    /// transitions.
    pub async fn run(&self) -> Result<(), ApplicationError> {
        info!(
            max_tasks = self.config.max_tasks,
            finish_on_empty = self.config.finish_on_empty,
            "worker pool started"
        );
        let mut workers: JoinSet<()> = JoinSet::new();
        let mut delay = AdaptiveDelay::new(self.config.clone());

        let result = loop {
            if !self.flag.is_set() {
                break Ok(());
            }

            // Reap finished workers, then wait for a free slot if the pool
            // is saturated.
            while workers.try_join_next().is_some() {}
            while workers.len() >= self.config.max_tasks {
                let _ = workers.join_next().await;
            }

            let sleep_for = match self.broker.pop(self.config.pop_timeout).await {
                Ok(Some(instruction)) => {
                    debug!(%instruction, "dispatching instruction");
                    let performer = Arc::clone(&self.performer);
                    let flag = self.flag.clone();
                    workers.spawn(async move {
                        performer.perform(instruction, &flag).await;
                    });
                    delay.on_hit()
                }
                Ok(None) => {
                    if self.config.finish_on_empty && workers.is_empty() {
                        match self.store.count_pending().await {
                            Ok(0) => break Ok(()),
                            Ok(pending) => debug!(pending, "queue empty but tasks still pending"),
                            Err(e) => warn!(error = %e, "pending count failed"),
                        }
                    }
                    delay.on_empty()
                }
                Err(e) => {
                    warn!(error = %e, "broker poll failed");
                    if self.config.finish_on_empty {
                        break Err(e);
                    }
                    delay.on_error()
                }
            };

            tokio::select! {
                () = tokio::time::sleep(sleep_for) => {}
                () = self.flag.cleared() => {}
            }
        };

        // Drain in-flight workers before reporting.
        while workers.join_next().await.is_some() {}
        info!("worker pool drained");
        result
    }
}
