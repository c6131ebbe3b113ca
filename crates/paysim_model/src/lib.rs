//! Typed data model for the payment pipeline simulator.
//!
//! This crate provides:
//! - Transactions, their lifecycle statuses and append-only stage logs
//! - Derived pipeline metrics and per-stage counters
//! - The enumerated speed multipliers accepted by the engine
//! - Small presentation helpers (risk levels, latency formatting)
//!
//! # Example
//!
//! ```rust,ignore
//! use paysim_model::{Transaction, TransactionStatus, TransactionUpdate, StageLog};
//!
//! let tx = tx.apply(TransactionUpdate::advance(
//!     TransactionStatus::FraudCheck,
//!     StageLog::passed(TransactionStatus::FraudCheck, now, now, 420),
//! ));
//! assert_eq!(tx.stages.len(), 2);
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod metrics;
pub mod speed;
pub mod transaction;

pub use error::{Error, Result};
pub use metrics::{format_latency, success_rate, PipelineMetrics, StageMetrics};
pub use speed::Speed;
pub use transaction::{
    RiskLevel, StageLog, Transaction, TransactionStatus, TransactionType, TransactionUpdate,
    DECLARED_STAGES, PIPELINE_ORDER,
};
