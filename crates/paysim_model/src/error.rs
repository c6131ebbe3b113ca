//! Error types for the simulator model.

use thiserror::Error;

/// Errors that can occur while constructing or parsing model values.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Speed multiplier outside the accepted set.
    #[error("invalid speed '{value}': expected one of 0.5, 1, 2, 4")]
    InvalidSpeed {
        /// The rejected input.
        value: String,
    },

    /// Unrecognized transaction status name.
    #[error("unknown transaction status: {0}")]
    UnknownStatus(String),

    /// Unrecognized transaction type name.
    #[error("unknown transaction type: {0}")]
    UnknownTransactionType(String),
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;
