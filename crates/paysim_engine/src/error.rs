//! Error types for engine operations.

use thiserror::Error;

/// Errors that can occur outside the simulated domain.
///
/// Stage failures are never errors; they are recorded on the transaction.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid model value.
    #[error(transparent)]
    Model(#[from] paysim_model::Error),

    /// Failed to produce an export document.
    #[error("export error: {0}")]
    Export(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// CSV serialization error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
