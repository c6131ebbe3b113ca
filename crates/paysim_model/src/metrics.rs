//! Derived pipeline metrics.

use crate::transaction::{Transaction, TransactionStatus, DECLARED_STAGES};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counters for one declared stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageMetrics {
    /// Stage these counters belong to.
    pub stage: TransactionStatus,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Nominal average latency in milliseconds.
    pub avg_latency: u64,
    /// Nominal success rate in percent.
    pub success_rate: u8,
    /// Transactions currently sitting in this stage.
    pub active_transactions: usize,
}

impl StageMetrics {
    /// Returns the nominal profile of `stage` with no active transactions.
    #[must_use]
    pub fn nominal(stage: TransactionStatus) -> Self {
        let (avg_latency, success_rate) = match stage {
            TransactionStatus::Initiated => (100, 100),
            TransactionStatus::FraudCheck => (500, 92),
            TransactionStatus::BalanceVerify => (250, 95),
            TransactionStatus::Processing => (650, 98),
            TransactionStatus::Settlement => (1250, 99),
            TransactionStatus::Completed
            | TransactionStatus::Failed
            | TransactionStatus::RetryQueue => (0, 0),
        };
        Self {
            stage,
            name: stage.display_name().to_string(),
            description: stage.description().to_string(),
            avg_latency,
            success_rate,
            active_transactions: 0,
        }
    }
}

/// Snapshot of pipeline health derived from the transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetrics {
    /// Number of transactions in the history.
    pub total_transactions: usize,
    /// Completed transactions.
    pub successful_transactions: usize,
    /// Failed transactions.
    pub failed_transactions: usize,
    /// Mean end-to-end simulated latency of completed transactions, in ms.
    pub avg_processing_time: u64,
    /// Completed share of terminal transactions, in percent.
    pub throughput: u32,
    /// Per-stage counters in pipeline order.
    pub stages: Vec<StageMetrics>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            total_transactions: 0,
            successful_transactions: 0,
            failed_transactions: 0,
            avg_processing_time: 0,
            throughput: 0,
            stages: DECLARED_STAGES.into_iter().map(StageMetrics::nominal).collect(),
        }
    }
}

impl PipelineMetrics {
    /// Derives metrics from the current transaction history.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let completed: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Completed)
            .collect();
        let failed = transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Failed)
            .count();

        let avg_processing_time = if completed.is_empty() {
            0
        } else {
            let total: u64 = completed.iter().map(|t| t.total_latency()).sum();
            (total as f64 / completed.len() as f64).round() as u64
        };

        let mut active: HashMap<TransactionStatus, usize> = HashMap::new();
        for tx in transactions.iter().filter(|t| t.status.is_in_flight()) {
            *active.entry(tx.status).or_default() += 1;
        }

        let stages = DECLARED_STAGES
            .into_iter()
            .map(|stage| StageMetrics {
                active_transactions: active.get(&stage).copied().unwrap_or(0),
                ..StageMetrics::nominal(stage)
            })
            .collect();

        Self {
            total_transactions: transactions.len(),
            successful_transactions: completed.len(),
            failed_transactions: failed,
            avg_processing_time,
            throughput: success_rate(completed.len(), completed.len() + failed),
            stages,
        }
    }

    /// Returns the number of transactions still moving through stages.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.stages.iter().map(|s| s.active_transactions).sum()
    }

    /// Returns the counters for `stage`, if it is a declared stage.
    #[must_use]
    pub fn stage(&self, stage: TransactionStatus) -> Option<&StageMetrics> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Rounded percentage of `successful` over `total`; 0 when `total` is 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn success_rate(successful: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((successful as f64 / total as f64) * 100.0).round() as u32
}

/// Formats a latency as `"{n}ms"` below one second, seconds otherwise.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_latency(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.2}s", ms as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{StageLog, TransactionType, TransactionUpdate};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn tx(id: &str) -> Transaction {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Transaction::new(id, TransactionType::Payment, 42.5, at)
    }

    fn with_status(id: &str, status: TransactionStatus, latency: u64) -> Transaction {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let log = if status == TransactionStatus::Failed {
            StageLog::failed(TransactionStatus::Processing, at, at, latency, "Processing timeout")
        } else {
            StageLog::passed(TransactionStatus::Settlement, at, at, latency)
        };
        tx(id).apply(TransactionUpdate::advance(status, log))
    }

    #[test]
    fn empty_history_has_nominal_stages() {
        let metrics = PipelineMetrics::from_transactions(&[]);
        assert_eq!(metrics, PipelineMetrics::default());
        assert_eq!(metrics.stages.len(), 5);
        assert_eq!(metrics.throughput, 0);
        let fraud = metrics.stage(TransactionStatus::FraudCheck).unwrap();
        assert_eq!(fraud.avg_latency, 500);
        assert_eq!(fraud.success_rate, 92);
    }

    #[test]
    fn counts_terminal_and_active() {
        let history = vec![
            with_status("a", TransactionStatus::Completed, 1000),
            with_status("b", TransactionStatus::Completed, 2001),
            with_status("c", TransactionStatus::Failed, 300),
            with_status("d", TransactionStatus::Processing, 300),
            with_status("e", TransactionStatus::RetryQueue, 300),
            tx("f"),
        ];

        let metrics = PipelineMetrics::from_transactions(&history);
        assert_eq!(metrics.total_transactions, 6);
        assert_eq!(metrics.successful_transactions, 2);
        assert_eq!(metrics.failed_transactions, 1);
        assert_eq!(metrics.avg_processing_time, 1501);
        assert_eq!(metrics.throughput, 67);
        assert_eq!(
            metrics.stage(TransactionStatus::Processing).unwrap().active_transactions,
            1
        );
        assert_eq!(
            metrics.stage(TransactionStatus::Initiated).unwrap().active_transactions,
            1
        );
        assert_eq!(metrics.in_flight(), 2);
    }

    #[test]
    fn latency_formatting() {
        assert_eq!(format_latency(0), "0ms");
        assert_eq!(format_latency(999), "999ms");
        assert_eq!(format_latency(1000), "1.00s");
        assert_eq!(format_latency(2345), "2.35s");
    }

    proptest! {
        #[test]
        fn throughput_matches_rounded_ratio(completed in 0usize..40, failed in 0usize..40) {
            let mut history = Vec::new();
            for i in 0..completed {
                history.push(with_status(&format!("c{i}"), TransactionStatus::Completed, 100));
            }
            for i in 0..failed {
                history.push(with_status(&format!("f{i}"), TransactionStatus::Failed, 100));
            }

            let metrics = PipelineMetrics::from_transactions(&history);
            let terminal = completed + failed;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
            let expected = if terminal == 0 {
                0
            } else {
                (completed as f64 / terminal as f64 * 100.0).round() as u32
            };
            prop_assert_eq!(metrics.throughput, expected);
        }

        #[test]
        fn derivation_is_idempotent(completed in 0usize..10, failed in 0usize..10) {
            let mut history = Vec::new();
            for i in 0..completed {
                history.push(with_status(&format!("c{i}"), TransactionStatus::Completed, 700));
            }
            for i in 0..failed {
                history.push(with_status(&format!("f{i}"), TransactionStatus::Failed, 90));
            }
            prop_assert_eq!(
                PipelineMetrics::from_transactions(&history),
                PipelineMetrics::from_transactions(&history)
            );
        }
    }
}
