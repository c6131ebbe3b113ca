//! Per-transaction stage walker.
//!
//! A driver run owns a local copy of one transaction and advances it hop by
//! hop: draw a latency, sleep for it at the current speed, decide the
//! outcome, publish the result to the store. A failed hop ends the run and
//! queues the transaction for resubmission. Runs never retry on their own.

use crate::entropy::Entropy;
use crate::policy::{next_stage, StagePolicy};
use crate::store::{Action, Store};
use chrono::Utc;
use paysim_model::{StageLog, Transaction, TransactionStatus, TransactionUpdate};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Drives transactions through the pipeline stages.
#[derive(Debug, Clone)]
pub struct Driver {
    store: Store,
    policy: Arc<StagePolicy>,
    entropy: Entropy,
}

impl Driver {
    /// Creates a driver publishing to `store`.
    #[must_use]
    pub fn new(store: Store, policy: StagePolicy, entropy: Entropy) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
            entropy,
        }
    }

    /// Returns the stage policy in use.
    #[must_use]
    pub fn policy(&self) -> &StagePolicy {
        &self.policy
    }

    /// Walks `transaction` through the remaining stages.
    ///
    /// The transaction must already be registered in the store. The speed
    /// multiplier is read from the store before every hop, so a speed
    /// change applies to the next hop of every in-flight run.
    pub async fn run(&self, mut transaction: Transaction) {
        while !transaction.status.is_terminal() {
            let Some(stage) = next_stage(transaction.status) else {
                debug!(
                    "{} has no stage after {}",
                    transaction.id, transaction.status
                );
                break;
            };

            let latency = self
                .entropy
                .with(|rng| self.policy.stage_latency(stage, rng));
            let entered_at = Utc::now();
            let delay = self.store.speed().scale_millis(latency);
            debug!(
                "{} entering {} for {}ms ({:?} wall clock)",
                transaction.id, stage, latency, delay
            );
            tokio::time::sleep(delay).await;
            let exited_at = Utc::now();

            let failure = self.entropy.with(|rng| {
                self.policy
                    .should_fail(&transaction, stage, rng)
                    .then(|| self.policy.failure_message(stage, &transaction, rng))
            });

            if let Some(reason) = failure {
                warn!("{} failed at {}: {}", transaction.id, stage, reason);
                let log = StageLog::failed(stage, entered_at, exited_at, latency, reason);
                let update = TransactionUpdate::fail(log);
                transaction = transaction.apply(update.clone());
                self.store.dispatch_all([
                    Action::UpdateTransaction {
                        id: transaction.id.clone(),
                        update,
                    },
                    Action::MoveToRetry(transaction.id.clone()),
                ]);
                break;
            }

            let status = if stage == TransactionStatus::Settlement {
                TransactionStatus::Completed
            } else {
                stage
            };
            let log = StageLog::passed(stage, entered_at, exited_at, latency);
            let update = TransactionUpdate::advance(status, log);
            transaction = transaction.apply(update.clone());
            self.store.dispatch_all([
                Action::UpdateTransaction {
                    id: transaction.id.clone(),
                    update,
                },
                Action::RecomputeMetrics,
            ]);
        }

        self.store.dispatch(Action::RecomputeMetrics);
        if transaction.status == TransactionStatus::Completed {
            info!(
                "{} completed in {}ms",
                transaction.id,
                transaction.total_latency()
            );
        }
    }

    /// Starts a detached run of `transaction` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(&self, transaction: Transaction) -> JoinHandle<()> {
        let driver = self.clone();
        tokio::spawn(async move { driver.run(transaction).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use paysim_model::{Speed, TransactionType};
    use std::time::Duration;

    fn tx(id: &str, score: u8) -> Transaction {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Transaction::new(id, TransactionType::Transfer, 1_000.0, at).with_fraud_score(score)
    }

    fn registered(store: &Store, transaction: &Transaction) {
        store.dispatch(Action::AddTransaction(transaction.clone()));
    }

    #[tokio::test(start_paused = true)]
    async fn high_score_fails_fraud_check() {
        let store = Store::default();
        let driver = Driver::new(store.clone(), StagePolicy::new(), Entropy::seeded(1));
        let t = tx("fraud", 90);
        registered(&store, &t);

        driver.run(t).await;

        let state = store.snapshot();
        let record = state.transaction("fraud").unwrap();
        assert_eq!(record.status, TransactionStatus::Failed);
        assert_eq!(record.stages.len(), 2);
        let last = record.last_stage().unwrap();
        assert_eq!(last.stage, TransactionStatus::FraudCheck);
        assert!(!last.success);
        assert!(last.message.is_some());
        assert_eq!(state.retry_ids(), ["fraud"]);
        assert_eq!(state.metrics.failed_transactions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clean_run_completes_with_every_stage_logged() {
        let store = Store::default();
        let policy = StagePolicy::new().without_random_failures();
        let driver = Driver::new(store.clone(), policy, Entropy::seeded(2));
        let t = tx("clean", 10);
        registered(&store, &t);

        driver.run(t).await;

        let state = store.snapshot();
        let record = state.transaction("clean").unwrap();
        assert_eq!(record.status, TransactionStatus::Completed);
        let stages: Vec<TransactionStatus> = record.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            [
                TransactionStatus::Initiated,
                TransactionStatus::FraudCheck,
                TransactionStatus::BalanceVerify,
                TransactionStatus::Processing,
                TransactionStatus::Settlement,
            ]
        );
        assert!(record.stages.iter().all(|s| s.success));
        assert!(state.retry_queue.is_empty());
        assert_eq!(state.metrics.successful_transactions, 1);
        assert_eq!(state.metrics.throughput, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn certain_failure_stops_at_balance_verify() {
        let store = Store::default();
        let policy = StagePolicy::new().with_failure_rate(1.0);
        let driver = Driver::new(store.clone(), policy, Entropy::seeded(3));
        let t = tx("broke", 0);
        registered(&store, &t);

        driver.run(t).await;

        let record = store.transaction("broke").unwrap();
        assert_eq!(record.status, TransactionStatus::Failed);
        assert_eq!(
            record.last_stage().map(|s| s.stage),
            Some(TransactionStatus::BalanceVerify)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hop_delay_is_scaled_by_speed() {
        let store = Store::default();
        store.dispatch(Action::SetSpeed(Speed::Double));
        let policy = StagePolicy::new()
            .without_random_failures()
            .with_fixed_latency(1_000);
        let driver = Driver::new(store.clone(), policy, Entropy::seeded(4));
        let t = tx("fast", 0);
        registered(&store, &t);

        let started = tokio::time::Instant::now();
        driver.run(t).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2_000));
        assert!(elapsed < Duration::from_millis(2_010));
        assert_eq!(
            store.transaction("fast").unwrap().total_latency(),
            4_000
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unregistered_run_is_harmless() {
        let store = Store::default();
        let driver = Driver::new(store.clone(), StagePolicy::new(), Entropy::seeded(5));

        driver.run(tx("ghost", 99)).await;

        let state = store.snapshot();
        assert!(state.transactions.is_empty());
        assert!(state.retry_queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_transaction_is_left_alone() {
        let store = Store::default();
        let driver = Driver::new(store.clone(), StagePolicy::new(), Entropy::seeded(6));
        let mut t = tx("done", 0);
        t.status = TransactionStatus::Completed;
        registered(&store, &t);

        driver.run(t.clone()).await;

        assert_eq!(store.transaction("done"), Some(t));
    }
}
