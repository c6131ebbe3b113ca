//! Stage policy: ordering, latency and failure decisions.
//!
//! The fraud check is a plain threshold on the transaction's own score, so
//! its outcome is reproducible. Balance verification, processing and
//! settlement fail with fixed independent probabilities.

use paysim_model::{Transaction, TransactionStatus, PIPELINE_ORDER};
use rand::prelude::*;

/// Returns the stage after `current`, or `None` for `completed` and
/// statuses outside the pipeline order.
#[must_use]
pub fn next_stage(current: TransactionStatus) -> Option<TransactionStatus> {
    let index = PIPELINE_ORDER.iter().position(|s| *s == current)?;
    PIPELINE_ORDER.get(index + 1).copied()
}

/// Inclusive latency range in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRange {
    /// Shortest latency.
    pub min_ms: u64,
    /// Longest latency.
    pub max_ms: u64,
}

impl LatencyRange {
    /// Zero-width range used by terminal states.
    pub const ZERO: Self = Self::fixed(0);

    /// Creates a new range.
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Creates a range that always yields `ms`.
    #[must_use]
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    /// Draws a latency from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.max_ms > self.min_ms {
            rng.gen_range(self.min_ms..=self.max_ms)
        } else {
            self.min_ms
        }
    }
}

/// Tunable parameters of the stage policy.
#[derive(Debug, Clone, PartialEq)]
pub struct StagePolicy {
    /// Latency of the initiated hop.
    pub initiated_latency: LatencyRange,
    /// Latency of the fraud check.
    pub fraud_check_latency: LatencyRange,
    /// Latency of balance verification.
    pub balance_verify_latency: LatencyRange,
    /// Latency of processing.
    pub processing_latency: LatencyRange,
    /// Latency of settlement.
    pub settlement_latency: LatencyRange,
    /// Scores strictly above this fail the fraud check.
    pub fraud_threshold: u8,
    /// Probability that balance verification fails.
    pub balance_verify_failure_rate: f64,
    /// Probability that processing fails.
    pub processing_failure_rate: f64,
    /// Probability that settlement fails.
    pub settlement_failure_rate: f64,
}

impl Default for StagePolicy {
    fn default() -> Self {
        Self {
            initiated_latency: LatencyRange::new(50, 150),
            fraud_check_latency: LatencyRange::new(200, 800),
            balance_verify_latency: LatencyRange::new(100, 400),
            processing_latency: LatencyRange::new(300, 1000),
            settlement_latency: LatencyRange::new(500, 2000),
            fraud_threshold: 75,
            balance_verify_failure_rate: 0.08,
            processing_failure_rate: 0.03,
            settlement_failure_rate: 0.02,
        }
    }
}

impl StagePolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables all probabilistic failures; only the fraud threshold remains.
    #[must_use]
    pub const fn without_random_failures(mut self) -> Self {
        self.balance_verify_failure_rate = 0.0;
        self.processing_failure_rate = 0.0;
        self.settlement_failure_rate = 0.0;
        self
    }

    /// Sets the same failure probability for every probabilistic stage.
    #[must_use]
    pub const fn with_failure_rate(mut self, rate: f64) -> Self {
        self.balance_verify_failure_rate = rate;
        self.processing_failure_rate = rate;
        self.settlement_failure_rate = rate;
        self
    }

    /// Uses the same fixed latency for every stage.
    #[must_use]
    pub const fn with_fixed_latency(mut self, ms: u64) -> Self {
        let range = LatencyRange::fixed(ms);
        self.initiated_latency = range;
        self.fraud_check_latency = range;
        self.balance_verify_latency = range;
        self.processing_latency = range;
        self.settlement_latency = range;
        self
    }

    /// Sets the fraud score threshold.
    #[must_use]
    pub const fn with_fraud_threshold(mut self, threshold: u8) -> Self {
        self.fraud_threshold = threshold;
        self
    }

    /// Returns the latency range of `stage`.
    #[must_use]
    pub const fn latency_range(&self, stage: TransactionStatus) -> LatencyRange {
        match stage {
            TransactionStatus::Initiated => self.initiated_latency,
            TransactionStatus::FraudCheck => self.fraud_check_latency,
            TransactionStatus::BalanceVerify => self.balance_verify_latency,
            TransactionStatus::Processing => self.processing_latency,
            TransactionStatus::Settlement => self.settlement_latency,
            TransactionStatus::Completed
            | TransactionStatus::Failed
            | TransactionStatus::RetryQueue => LatencyRange::ZERO,
        }
    }

    /// Returns the failure probability of a probabilistic stage, 0 otherwise.
    #[must_use]
    pub const fn failure_rate(&self, stage: TransactionStatus) -> f64 {
        match stage {
            TransactionStatus::BalanceVerify => self.balance_verify_failure_rate,
            TransactionStatus::Processing => self.processing_failure_rate,
            TransactionStatus::Settlement => self.settlement_failure_rate,
            _ => 0.0,
        }
    }

    /// Draws the simulated latency of `stage` in milliseconds.
    pub fn stage_latency<R: Rng + ?Sized>(&self, stage: TransactionStatus, rng: &mut R) -> u64 {
        self.latency_range(stage).sample(rng)
    }

    /// Decides whether `transaction` fails at `stage`.
    ///
    /// The fraud check consumes no randomness.
    pub fn should_fail<R: Rng + ?Sized>(
        &self,
        transaction: &Transaction,
        stage: TransactionStatus,
        rng: &mut R,
    ) -> bool {
        match stage {
            TransactionStatus::FraudCheck => transaction.fraud_score > self.fraud_threshold,
            TransactionStatus::BalanceVerify
            | TransactionStatus::Processing
            | TransactionStatus::Settlement => rng.gen::<f64>() < self.failure_rate(stage),
            _ => false,
        }
    }

    /// Picks a human-readable reason for a failure at `stage`.
    pub fn failure_message<R: Rng + ?Sized>(
        &self,
        stage: TransactionStatus,
        transaction: &Transaction,
        rng: &mut R,
    ) -> String {
        let reasons: Vec<String> = match stage {
            TransactionStatus::Initiated => vec!["Connection timeout".to_string()],
            TransactionStatus::FraudCheck => vec![
                format!("High risk score detected ({}/100)", transaction.fraud_score),
                "Suspicious transaction pattern".to_string(),
                "Flagged by ML model - unusual amount".to_string(),
            ],
            TransactionStatus::BalanceVerify => strings(&[
                "Insufficient funds",
                "Account hold detected",
                "Daily limit exceeded",
            ]),
            TransactionStatus::Processing => strings(&[
                "Processing timeout",
                "Internal service error",
                "Rate limit exceeded",
            ]),
            TransactionStatus::Settlement => strings(&[
                "Settlement network unavailable",
                "Recipient bank rejected",
                "Clearing house timeout",
            ]),
            TransactionStatus::Completed
            | TransactionStatus::Failed
            | TransactionStatus::RetryQueue => Vec::new(),
        };

        reasons
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
