//! Transaction data model.
//!
//! A transaction's `stages` vector is its audit trail. The only way to
//! change a transaction after creation is [`Transaction::apply`], which can
//! set the status and append one [`StageLog`]; it never rewrites or removes
//! an existing entry.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Currency used by every simulated transaction.
pub const DEFAULT_CURRENCY: &str = "CAD";

const INITIATED_MESSAGE: &str = "Transaction initiated successfully";

/// Pipeline stage or terminal state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Received and queued for processing.
    Initiated,
    /// Risk scoring.
    FraudCheck,
    /// Balance and limit validation.
    BalanceVerify,
    /// Execution.
    Processing,
    /// Clearing and settlement.
    Settlement,
    /// Terminal success.
    Completed,
    /// Terminal failure.
    Failed,
    /// Synthetic status of a failed copy waiting in the retry queue.
    RetryQueue,
}

/// Fixed linear order a transaction advances through.
pub const PIPELINE_ORDER: [TransactionStatus; 6] = [
    TransactionStatus::Initiated,
    TransactionStatus::FraudCheck,
    TransactionStatus::BalanceVerify,
    TransactionStatus::Processing,
    TransactionStatus::Settlement,
    TransactionStatus::Completed,
];

/// Stages that carry per-stage metrics.
pub const DECLARED_STAGES: [TransactionStatus; 5] = [
    TransactionStatus::Initiated,
    TransactionStatus::FraudCheck,
    TransactionStatus::BalanceVerify,
    TransactionStatus::Processing,
    TransactionStatus::Settlement,
];

impl TransactionStatus {
    /// All statuses, in pipeline order followed by the off-path states.
    pub const ALL: [Self; 8] = [
        Self::Initiated,
        Self::FraudCheck,
        Self::BalanceVerify,
        Self::Processing,
        Self::Settlement,
        Self::Completed,
        Self::Failed,
        Self::RetryQueue,
    ];

    /// Returns the snake_case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::FraudCheck => "fraud_check",
            Self::BalanceVerify => "balance_verify",
            Self::Processing => "processing",
            Self::Settlement => "settlement",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RetryQueue => "retry_queue",
        }
    }

    /// Returns the human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Initiated => "Initiated",
            Self::FraudCheck => "Fraud Check",
            Self::BalanceVerify => "Balance Verify",
            Self::Processing => "Processing",
            Self::Settlement => "Settlement",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::RetryQueue => "Retry Queue",
        }
    }

    /// Returns a one-line description of what happens in this state.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Initiated => "Transaction received and queued for processing",
            Self::FraudCheck => "ML-based risk scoring and fraud detection",
            Self::BalanceVerify => "Validating account balance and limits",
            Self::Processing => "Executing the transaction",
            Self::Settlement => "Final clearing and settlement",
            Self::Completed => "Transaction completed successfully",
            Self::Failed => "Transaction failed - moved to retry queue",
            Self::RetryQueue => "Awaiting manual review or retry",
        }
    }

    /// Returns true for `completed` and `failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true while a driver run may still advance the transaction.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        !matches!(self, Self::Completed | Self::Failed | Self::RetryQueue)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::UnknownStatus(s.to_string()))
    }
}

/// Kind of payment, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Person-to-person transfer.
    Transfer,
    /// Payment to an organization.
    Payment,
    /// Incoming deposit.
    Deposit,
    /// Cash withdrawal.
    Withdrawal,
}

impl TransactionType {
    /// All transaction types.
    pub const ALL: [Self; 4] = [Self::Transfer, Self::Payment, Self::Deposit, Self::Withdrawal];

    /// Returns the snake_case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Payment => "payment",
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownTransactionType(s.to_string()))
    }
}

/// Audit record of one stage attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageLog {
    /// Stage this record pertains to.
    pub stage: TransactionStatus,
    /// When the attempt started.
    pub entered_at: DateTime<Utc>,
    /// When the attempt finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exited_at: Option<DateTime<Utc>>,
    /// Simulated duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
    /// Outcome of the attempt.
    pub success: bool,
    /// Success message or failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StageLog {
    /// Creates the opening `initiated` record every transaction starts with.
    #[must_use]
    pub fn initiated(at: DateTime<Utc>) -> Self {
        Self {
            stage: TransactionStatus::Initiated,
            entered_at: at,
            exited_at: None,
            latency: None,
            success: true,
            message: Some(INITIATED_MESSAGE.to_string()),
        }
    }

    /// Creates a successful record for `stage`.
    #[must_use]
    pub fn passed(
        stage: TransactionStatus,
        entered_at: DateTime<Utc>,
        exited_at: DateTime<Utc>,
        latency_ms: u64,
    ) -> Self {
        Self {
            stage,
            entered_at,
            exited_at: Some(exited_at),
            latency: Some(latency_ms),
            success: true,
            message: Some(format!("{stage} completed")),
        }
    }

    /// Creates a failed record for `stage` with the given reason.
    #[must_use]
    pub fn failed(
        stage: TransactionStatus,
        entered_at: DateTime<Utc>,
        exited_at: DateTime<Utc>,
        latency_ms: u64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            entered_at,
            exited_at: Some(exited_at),
            latency: Some(latency_ms),
            success: false,
            message: Some(reason.into()),
        }
    }
}

/// Partial update applied to a registered transaction.
///
/// Stage logs can only be appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionUpdate {
    /// New status, if it changes.
    pub status: Option<TransactionStatus>,
    /// Stage log to append.
    pub stage: Option<StageLog>,
}

impl TransactionUpdate {
    /// Moves to `status` and records the attempt that got it there.
    #[must_use]
    pub const fn advance(status: TransactionStatus, log: StageLog) -> Self {
        Self {
            status: Some(status),
            stage: Some(log),
        }
    }

    /// Marks the transaction failed and records the failed attempt.
    #[must_use]
    pub const fn fail(log: StageLog) -> Self {
        Self {
            status: Some(TransactionStatus::Failed),
            stage: Some(log),
        }
    }
}

/// Coarse risk bucket for a fraud score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    /// 0 to 25.
    Low,
    /// 26 to 50.
    Medium,
    /// 51 to 75.
    High,
    /// Above 75.
    Critical,
}

impl RiskLevel {
    /// Buckets a fraud score.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        match score {
            0..=25 => Self::Low,
            26..=50 => Self::Medium,
            51..=75 => Self::High,
            _ => Self::Critical,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// A single simulated payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier.
    pub id: String,
    /// Positive amount, range depends on `kind`.
    pub amount: f64,
    /// Currency code.
    pub currency: String,
    /// Sender display name.
    pub sender: String,
    /// Recipient display name (an organization for payments).
    pub recipient: String,
    /// Transaction type.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Current stage or terminal state.
    pub status: TransactionStatus,
    /// Synthetic 0-100 risk score, fixed at creation.
    pub fraud_score: u8,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Append-only audit trail.
    pub stages: Vec<StageLog>,
    /// Free-form attributes carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl Transaction {
    /// Creates a freshly initiated transaction.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: TransactionType,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            sender: String::new(),
            recipient: String::new(),
            kind,
            status: TransactionStatus::Initiated,
            fraud_score: 0,
            timestamp,
            stages: vec![StageLog::initiated(timestamp)],
            metadata: None,
        }
    }

    /// Sets the sender.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Sets the recipient.
    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    /// Sets the currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Sets the fraud score, capped at 100.
    ///
    /// Only meaningful before the transaction is registered; nothing else
    /// changes the score afterwards.
    #[must_use]
    pub fn with_fraud_score(mut self, score: u8) -> Self {
        self.fraud_score = score.min(100);
        self
    }

    /// Adds a metadata attribute.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Applies a partial update, returning the updated transaction.
    #[must_use]
    pub fn apply(mut self, update: TransactionUpdate) -> Self {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(log) = update.stage {
            self.stages.push(log);
        }
        self
    }

    /// Returns the copy placed in the retry queue.
    #[must_use]
    pub fn queued(&self) -> Self {
        Self {
            status: TransactionStatus::RetryQueue,
            ..self.clone()
        }
    }

    /// Returns a fresh attempt carrying over this transaction's payment data.
    ///
    /// The new attempt gets its own id and creation time and starts over
    /// with a single `initiated` record.
    #[must_use]
    pub fn resubmit(&self, id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: TransactionStatus::Initiated,
            timestamp: at,
            stages: vec![StageLog::initiated(at)],
            ..self.clone()
        }
    }

    /// Returns the most recent stage attempt.
    #[must_use]
    pub fn last_stage(&self) -> Option<&StageLog> {
        self.stages.last()
    }

    /// Returns the sum of all recorded stage latencies in milliseconds.
    #[must_use]
    pub fn total_latency(&self) -> u64 {
        self.stages.iter().filter_map(|s| s.latency).sum()
    }

    /// Returns the risk bucket of the fraud score.
    #[must_use]
    pub const fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.fraud_score)
    }
}
