//! Scheduler and lifecycle controller.
//!
//! The [`Pipeline`] owns the store, the driver and the factory, and exposes
//! the command interface: manual generation, pause and resume, speed
//! changes, history cleanup and retries. [`Pipeline::run_scheduler`] is the
//! auto-generation loop; it spawns one driver task per transaction and never
//! waits for them.

use crate::config::EngineConfig;
use crate::driver::Driver;
use crate::entropy::Entropy;
use crate::factory::{mint_id, TransactionFactory};
use crate::store::{Action, PipelineState, Store};
use chrono::Utc;
use paysim_model::{Speed, Transaction};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to a running simulation.
///
/// Clones share the same state.
#[derive(Debug, Clone)]
pub struct Pipeline {
    store: Store,
    driver: Driver,
    factory: Arc<TransactionFactory>,
    entropy: Entropy,
    base_interval: Duration,
    control: Arc<Notify>,
}

impl Pipeline {
    /// Builds a pipeline from `config`.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let store = Store::new(PipelineState {
            is_running: config.start_running,
            speed: config.speed,
            history_limit: config.history_limit,
            ..PipelineState::default()
        });
        let entropy = Entropy::new(config.seed);
        let driver = Driver::new(store.clone(), config.policy, entropy.clone());
        Self {
            store,
            driver,
            factory: Arc::new(config.factory),
            entropy,
            base_interval: config.base_interval,
            control: Arc::new(Notify::new()),
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Returns an owned copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> PipelineState {
        self.store.snapshot()
    }

    /// Returns the seed in use, if one was configured.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.entropy.seed()
    }

    /// Registers `transaction` and starts a driver run for it.
    pub fn submit(&self, transaction: Transaction) -> JoinHandle<()> {
        debug!("submitting {}", transaction.id);
        self.store.dispatch_all([
            Action::AddTransaction(transaction.clone()),
            Action::RecomputeMetrics,
        ]);
        self.driver.spawn(transaction)
    }

    /// Generates one transaction and starts it immediately.
    pub fn add_transaction_now(&self) -> JoinHandle<()> {
        let transaction = self
            .entropy
            .with(|rng| self.factory.create(rng, Utc::now()));
        self.submit(transaction)
    }

    /// Flips the auto-generation flag and returns the new value.
    pub fn toggle_running(&self) -> bool {
        let running = !self.store.is_running();
        self.set_running(running);
        running
    }

    /// Sets the auto-generation flag.
    ///
    /// Pausing only stops future ticks; runs already in flight continue.
    pub fn set_running(&self, running: bool) {
        self.store.dispatch(Action::SetRunning(running));
        if running {
            info!("pipeline resumed");
        } else {
            info!("pipeline paused");
        }
        self.control.notify_one();
    }

    /// Changes the speed multiplier.
    ///
    /// Restarts the tick timer and applies to the next hop of every
    /// in-flight run.
    pub fn set_speed(&self, speed: Speed) {
        self.store.dispatch(Action::SetSpeed(speed));
        info!("speed set to {}", speed);
        self.control.notify_one();
    }

    /// Drops completed and failed transactions from the history.
    pub fn clear_completed(&self) {
        self.store
            .dispatch_all([Action::ClearCompleted, Action::RecomputeMetrics]);
    }

    /// Resubmits the queued transaction `id` under a fresh id.
    ///
    /// Returns `None` when `id` is not queued.
    pub fn retry_one(&self, id: &str) -> Option<JoinHandle<()>> {
        let Some(queued) = self.store.take_from_retry_queue(id) else {
            debug!("{} is not in the retry queue", id);
            return None;
        };
        let now = Utc::now();
        let fresh_id = self.entropy.with(|rng| mint_id(rng, now));
        info!("retrying {} as {}", id, fresh_id);
        Some(self.submit(queued.resubmit(fresh_id, now)))
    }

    /// Resubmits every queued transaction.
    pub fn retry_all(&self) -> Vec<JoinHandle<()>> {
        self.store
            .read(PipelineState::retry_ids)
            .iter()
            .filter_map(|id| self.retry_one(id))
            .collect()
    }

    /// Runs the auto-generation loop until `shutdown` completes.
    ///
    /// While running, one transaction is generated every
    /// `base_interval / speed`. Pause, resume and speed changes restart
    /// the timer.
    pub async fn run_scheduler<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let running = self.store.is_running();
            let interval = self.store.speed().scale(self.base_interval);

            tokio::select! {
                () = &mut shutdown => {
                    debug!("scheduler stopped");
                    break;
                }
                () = self.control.notified() => {
                    debug!("scheduler timer restarted");
                }
                () = tokio::time::sleep(interval), if running => {
                    drop(self.add_transaction_now());
                }
            }
        }
    }

    /// Waits until no transaction in the history is still in flight.
    pub async fn settle(&self, poll: Duration) {
        while self.store.read(PipelineState::in_flight) > 0 {
            tokio::time::sleep(poll).await;
        }
    }
}
