//! Aggregate state and its reducer.
//!
//! All state changes go through [`reduce`], which consumes the current
//! state and an [`Action`] and returns the next state. The [`Store`] wraps
//! the state in a mutex and applies one action per lock, so every action is
//! atomic with respect to concurrently running drivers. The lock is never
//! held across an await point.

use paysim_model::{PipelineMetrics, Speed, Transaction, TransactionUpdate};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Default cap on the transaction history.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// The single source of truth for the simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    /// Transaction history, newest first.
    pub transactions: Vec<Transaction>,
    /// Failed transactions waiting for resubmission.
    pub retry_queue: Vec<Transaction>,
    /// Metrics as of the last recompute.
    pub metrics: PipelineMetrics,
    /// Whether transactions are generated automatically.
    pub is_running: bool,
    /// Current speed multiplier.
    pub speed: Speed,
    /// Maximum number of transactions kept in history.
    #[serde(skip)]
    pub history_limit: usize,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            transactions: Vec::new(),
            retry_queue: Vec::new(),
            metrics: PipelineMetrics::default(),
            is_running: true,
            speed: Speed::Normal,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl PipelineState {
    /// Returns the transaction with `id` from the history.
    #[must_use]
    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Returns the queued copy of `id`.
    #[must_use]
    pub fn queued(&self, id: &str) -> Option<&Transaction> {
        self.retry_queue.iter().find(|t| t.id == id)
    }

    /// Counts history entries that have not reached a terminal status.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.transactions
            .iter()
            .filter(|t| !t.status.is_terminal())
            .count()
    }

    /// Returns the ids waiting in the retry queue, oldest first.
    #[must_use]
    pub fn retry_ids(&self) -> Vec<String> {
        self.retry_queue.iter().map(|t| t.id.clone()).collect()
    }
}

/// A state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Prepends a transaction and evicts the oldest beyond the history limit.
    AddTransaction(Transaction),
    /// Merges an update into the transaction with `id`.
    UpdateTransaction {
        /// Target transaction.
        id: String,
        /// Status change and stage log to append.
        update: TransactionUpdate,
    },
    /// Queues a copy of a failed transaction for resubmission.
    MoveToRetry(String),
    /// Removes an id from the retry queue.
    AcknowledgeRetry(String),
    /// Re-derives metrics from the history.
    RecomputeMetrics,
    /// Sets the auto-generation flag.
    SetRunning(bool),
    /// Sets the speed multiplier.
    SetSpeed(Speed),
    /// Drops completed and failed transactions from the history.
    ClearCompleted,
}

/// Applies `action` to `state`.
///
/// Unknown ids make `UpdateTransaction`, `MoveToRetry` and
/// `AcknowledgeRetry` no-ops. Metrics change only on `RecomputeMetrics`.
#[must_use]
pub fn reduce(mut state: PipelineState, action: Action) -> PipelineState {
    match action {
        Action::AddTransaction(tx) => {
            state.transactions.insert(0, tx);
            state.transactions.truncate(state.history_limit);
        }
        Action::UpdateTransaction { id, update } => {
            match state.transactions.iter().position(|t| t.id == id) {
                Some(index) => {
                    let current = state.transactions.remove(index);
                    state.transactions.insert(index, current.apply(update));
                }
                None => debug!("ignoring update for unknown transaction {}", id),
            }
        }
        Action::MoveToRetry(id) => match state.transaction(&id).map(Transaction::queued) {
            Some(queued) => state.retry_queue.push(queued),
            None => debug!("cannot queue unknown transaction {}", id),
        },
        Action::AcknowledgeRetry(id) => {
            let before = state.retry_queue.len();
            state.retry_queue.retain(|t| t.id != id);
            if state.retry_queue.len() == before {
                debug!("{} was not in the retry queue", id);
            }
        }
        Action::RecomputeMetrics => {
            state.metrics = PipelineMetrics::from_transactions(&state.transactions);
        }
        Action::SetRunning(running) => state.is_running = running,
        Action::SetSpeed(speed) => state.speed = speed,
        Action::ClearCompleted => state.transactions.retain(|t| !t.status.is_terminal()),
    }
    state
}

/// Shared handle to the pipeline state.
#[derive(Debug, Clone, Default)]
pub struct Store {
    state: Arc<Mutex<PipelineState>>,
}

impl Store {
    /// Creates a store holding `state`.
    #[must_use]
    pub fn new(state: PipelineState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies one action atomically.
    pub fn dispatch(&self, action: Action) {
        let mut guard = self.lock();
        let current = std::mem::take(&mut *guard);
        *guard = reduce(current, action);
    }

    /// Applies several actions under a single lock.
    pub fn dispatch_all(&self, actions: impl IntoIterator<Item = Action>) {
        let mut guard = self.lock();
        let mut state = std::mem::take(&mut *guard);
        for action in actions {
            state = reduce(state, action);
        }
        *guard = state;
    }

    /// Removes `id` from the retry queue and returns the queued copy.
    ///
    /// Lookup and removal happen under one lock, so concurrent callers
    /// cannot both claim the same entry.
    pub fn take_from_retry_queue(&self, id: &str) -> Option<Transaction> {
        let mut guard = self.lock();
        let queued = guard.queued(id).cloned()?;
        let current = std::mem::take(&mut *guard);
        *guard = reduce(current, Action::AcknowledgeRetry(id.to_string()));
        Some(queued)
    }

    /// Reads the state without cloning it.
    pub fn read<T>(&self, f: impl FnOnce(&PipelineState) -> T) -> T {
        f(&self.lock())
    }

    /// Returns an owned copy of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> PipelineState {
        self.lock().clone()
    }

    /// Returns the current speed multiplier.
    #[must_use]
    pub fn speed(&self) -> Speed {
        self.read(|s| s.speed)
    }

    /// Returns whether auto-generation is on.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.read(|s| s.is_running)
    }

    /// Returns a copy of the transaction with `id`.
    #[must_use]
    pub fn transaction(&self, id: &str) -> Option<Transaction> {
        self.read(|s| s.transaction(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use paysim_model::{StageLog, TransactionStatus, TransactionType};
    use proptest::prelude::*;

    fn tx(id: &str) -> Transaction {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Transaction::new(id, TransactionType::Deposit, 900.0, at)
    }

    fn passed(stage: TransactionStatus) -> StageLog {
        let at = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
        StageLog::passed(stage, at, at, 100)
    }

    fn failed(stage: TransactionStatus) -> StageLog {
        let at = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
        StageLog::failed(stage, at, at, 100, "Insufficient funds")
    }

    fn apply_all(actions: impl IntoIterator<Item = Action>) -> PipelineState {
        actions
            .into_iter()
            .fold(PipelineState::default(), reduce)
    }

    #[test]
    fn add_prepends() {
        let state = apply_all([
            Action::AddTransaction(tx("a")),
            Action::AddTransaction(tx("b")),
        ]);
        let ids: Vec<&str> = state.transactions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn history_evicts_oldest_beyond_limit() {
        let state = apply_all((0..101).map(|i| Action::AddTransaction(tx(&format!("tx-{i}")))));
        assert_eq!(state.transactions.len(), 100);
        assert!(state.transaction("tx-0").is_none());
        assert_eq!(state.transactions[0].id, "tx-100");
        assert_eq!(state.transactions[99].id, "tx-1");
    }

    #[test]
    fn update_merges_status_and_appends_log() {
        let state = apply_all([
            Action::AddTransaction(tx("a")),
            Action::UpdateTransaction {
                id: "a".into(),
                update: TransactionUpdate::advance(
                    TransactionStatus::FraudCheck,
                    passed(TransactionStatus::FraudCheck),
                ),
            },
        ]);
        let a = state.transaction("a").unwrap();
        assert_eq!(a.status, TransactionStatus::FraudCheck);
        assert_eq!(a.stages.len(), 2);
    }

    #[test]
    fn update_keeps_position() {
        let state = apply_all([
            Action::AddTransaction(tx("a")),
            Action::AddTransaction(tx("b")),
            Action::AddTransaction(tx("c")),
            Action::UpdateTransaction {
                id: "b".into(),
                update: TransactionUpdate::advance(
                    TransactionStatus::FraudCheck,
                    passed(TransactionStatus::FraudCheck),
                ),
            },
        ]);
        let ids: Vec<&str> = state.transactions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let before = apply_all([Action::AddTransaction(tx("a"))]);
        let after = apply_all([
            Action::AddTransaction(tx("a")),
            Action::UpdateTransaction {
                id: "missing".into(),
                update: TransactionUpdate::fail(failed(TransactionStatus::Processing)),
            },
            Action::MoveToRetry("missing".into()),
            Action::AcknowledgeRetry("missing".into()),
        ]);
        assert_eq!(before, after);
    }

    #[test]
    fn move_to_retry_keeps_failed_record_in_history() {
        let state = apply_all([
            Action::AddTransaction(tx("a")),
            Action::UpdateTransaction {
                id: "a".into(),
                update: TransactionUpdate::fail(failed(TransactionStatus::FraudCheck)),
            },
            Action::MoveToRetry("a".into()),
        ]);
        assert_eq!(
            state.transaction("a").unwrap().status,
            TransactionStatus::Failed
        );
        let queued = state.queued("a").unwrap();
        assert_eq!(queued.status, TransactionStatus::RetryQueue);
        assert_eq!(queued.stages.len(), 2);
    }

    #[test]
    fn acknowledge_removes_from_queue_only() {
        let state = apply_all([
            Action::AddTransaction(tx("a")),
            Action::UpdateTransaction {
                id: "a".into(),
                update: TransactionUpdate::fail(failed(TransactionStatus::FraudCheck)),
            },
            Action::MoveToRetry("a".into()),
            Action::AcknowledgeRetry("a".into()),
        ]);
        assert!(state.retry_queue.is_empty());
        assert!(state.transaction("a").is_some());
    }

    #[test]
    fn clear_completed_keeps_in_flight_and_queue() {
        let state = apply_all([
            Action::AddTransaction(tx("done")),
            Action::AddTransaction(tx("broken")),
            Action::AddTransaction(tx("moving")),
            Action::UpdateTransaction {
                id: "done".into(),
                update: TransactionUpdate::advance(
                    TransactionStatus::Completed,
                    passed(TransactionStatus::Settlement),
                ),
            },
            Action::UpdateTransaction {
                id: "broken".into(),
                update: TransactionUpdate::fail(failed(TransactionStatus::BalanceVerify)),
            },
            Action::MoveToRetry("broken".into()),
            Action::ClearCompleted,
        ]);
        let ids: Vec<&str> = state.transactions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["moving"]);
        assert_eq!(state.retry_ids(), ["broken"]);
    }

    #[test]
    fn metrics_change_only_on_recompute() {
        let state = apply_all([
            Action::AddTransaction(tx("a")),
            Action::UpdateTransaction {
                id: "a".into(),
                update: TransactionUpdate::advance(
                    TransactionStatus::Completed,
                    passed(TransactionStatus::Settlement),
                ),
            },
        ]);
        assert_eq!(state.metrics, PipelineMetrics::default());

        let state = reduce(state, Action::RecomputeMetrics);
        assert_eq!(state.metrics.successful_transactions, 1);
        assert_eq!(state.metrics.throughput, 100);

        let again = reduce(state.clone(), Action::RecomputeMetrics);
        assert_eq!(again.metrics, state.metrics);
    }

    #[test]
    fn flags() {
        let state = apply_all([Action::SetRunning(false), Action::SetSpeed(Speed::Quad)]);
        assert!(!state.is_running);
        assert_eq!(state.speed, Speed::Quad);
    }

    #[test]
    fn store_take_from_retry_queue_claims_once() {
        let store = Store::default();
        store.dispatch_all([
            Action::AddTransaction(tx("a")),
            Action::UpdateTransaction {
                id: "a".into(),
                update: TransactionUpdate::fail(failed(TransactionStatus::Settlement)),
            },
            Action::MoveToRetry("a".into()),
        ]);

        let claimed = store.take_from_retry_queue("a").unwrap();
        assert_eq!(claimed.status, TransactionStatus::RetryQueue);
        assert!(store.take_from_retry_queue("a").is_none());
        assert!(store.snapshot().retry_queue.is_empty());
    }

    #[test]
    fn store_reads() {
        let store = Store::new(PipelineState {
            speed: Speed::Half,
            is_running: false,
            ..PipelineState::default()
        });
        store.dispatch(Action::AddTransaction(tx("a")));
        assert_eq!(store.speed(), Speed::Half);
        assert!(!store.is_running());
        assert_eq!(store.transaction("a").map(|t| t.id), Some("a".to_string()));
        assert_eq!(store.read(|s| s.transactions.len()), 1);
    }

    fn arb_action() -> impl Strategy<Value = Action> {
        let id = (0u8..12).prop_map(|n| format!("tx-{n}"));
        let stage = prop::sample::select(paysim_model::DECLARED_STAGES.to_vec());
        prop_oneof![
            4 => id.clone().prop_map(|id| Action::AddTransaction(tx(&id))),
            4 => (id.clone(), stage, any::<bool>()).prop_map(|(id, stage, ok)| {
                let update = if ok {
                    TransactionUpdate::advance(stage, passed(stage))
                } else {
                    TransactionUpdate::fail(failed(stage))
                };
                Action::UpdateTransaction { id, update }
            }),
            1 => id.clone().prop_map(Action::MoveToRetry),
            1 => id.prop_map(Action::AcknowledgeRetry),
            1 => Just(Action::RecomputeMetrics),
            1 => Just(Action::ClearCompleted),
        ]
    }

    proptest! {
        #[test]
        fn history_never_exceeds_limit(adds in 0usize..300) {
            let mut state = PipelineState::default();
            for i in 0..adds {
                state = reduce(state, Action::AddTransaction(tx(&format!("tx-{i}"))));
                prop_assert!(state.transactions.len() <= DEFAULT_HISTORY_LIMIT);
            }
            prop_assert_eq!(state.transactions.len(), adds.min(DEFAULT_HISTORY_LIMIT));
        }

        #[test]
        fn stage_logs_are_append_only(actions in prop::collection::vec(arb_action(), 1..80)) {
            let mut state = PipelineState::default();
            for action in actions {
                if let Action::AddTransaction(tx) = &action {
                    if state.transaction(&tx.id).is_some() {
                        continue;
                    }
                }
                let before = state.clone();
                state = reduce(state, action);
                for old in &before.transactions {
                    if let Some(new) = state.transaction(&old.id) {
                        prop_assert!(new.stages.len() >= old.stages.len());
                        prop_assert_eq!(&new.stages[..old.stages.len()], &old.stages[..]);
                    }
                }
            }
        }

        #[test]
        fn recompute_is_idempotent(actions in prop::collection::vec(arb_action(), 0..60)) {
            let state = actions.into_iter().fold(PipelineState::default(), reduce);
            let once = reduce(state, Action::RecomputeMetrics);
            let twice = reduce(once.clone(), Action::RecomputeMetrics);
            prop_assert_eq!(once.metrics, twice.metrics);
        }
    }
}
