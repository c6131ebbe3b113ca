//! JSON and CSV snapshots of the pipeline state.

use crate::error::{Error, Result};
use crate::store::PipelineState;
use chrono::{DateTime, SecondsFormat, Utc};
use paysim_model::{PipelineMetrics, Transaction};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Full JSON export document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
    /// When the export was taken.
    pub exported_at: DateTime<Utc>,
    /// Metrics as of the last recompute.
    pub metrics: &'a PipelineMetrics,
    /// Transaction history, newest first.
    pub transactions: &'a [Transaction],
    /// Queued failures.
    pub retry_queue: &'a [Transaction],
}

impl<'a> ExportDocument<'a> {
    /// Borrows the exported parts of `state`.
    #[must_use]
    pub fn new(state: &'a PipelineState, exported_at: DateTime<Utc>) -> Self {
        Self {
            exported_at,
            metrics: &state.metrics,
            transactions: &state.transactions,
            retry_queue: &state.retry_queue,
        }
    }
}

/// One CSV row.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Type")]
    kind: &'a str,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "Currency")]
    currency: &'a str,
    #[serde(rename = "Sender")]
    sender: &'a str,
    #[serde(rename = "Recipient")]
    recipient: &'a str,
    #[serde(rename = "Status")]
    status: &'a str,
    #[serde(rename = "Fraud Score")]
    fraud_score: u8,
    #[serde(rename = "Timestamp")]
    timestamp: String,
}

impl<'a> From<&'a Transaction> for CsvRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            id: &tx.id,
            kind: tx.kind.as_str(),
            amount: tx.amount,
            currency: &tx.currency,
            sender: &tx.sender,
            recipient: &tx.recipient,
            status: tx.status.as_str(),
            fraud_score: tx.fraud_score,
            timestamp: tx.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Renders the pretty-printed JSON export.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json(state: &PipelineState, exported_at: DateTime<Utc>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ExportDocument::new(
        state,
        exported_at,
    ))?)
}

/// Writes one CSV row per history entry to `writer`.
///
/// # Errors
///
/// Returns an error if a row cannot be written.
pub fn write_csv<W: Write>(state: &PipelineState, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if state.transactions.is_empty() {
        csv_writer.write_record(CSV_HEADERS)?;
    }
    for tx in &state.transactions {
        csv_writer.serialize(CsvRow::from(tx))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Renders the CSV export.
///
/// # Errors
///
/// Returns an error if a row cannot be written.
pub fn to_csv(state: &PipelineState) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(state, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| Error::Export(e.to_string()))
}

/// Writes the JSON export to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_json_file(
    state: &PipelineState,
    exported_at: DateTime<Utc>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut file, &ExportDocument::new(state, exported_at))?;
    file.flush()?;
    Ok(())
}

/// Writes the CSV export to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_csv_file(state: &PipelineState, path: impl AsRef<Path>) -> Result<()> {
    write_csv(state, BufWriter::new(File::create(path)?))
}

const CSV_HEADERS: [&str; 9] = [
    "ID",
    "Type",
    "Amount",
    "Currency",
    "Sender",
    "Recipient",
    "Status",
    "Fraud Score",
    "Timestamp",
];
