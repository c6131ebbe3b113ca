//! Health command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use paysim_engine::status;

/// Prints the health payload.
pub fn run() -> Result<()> {
    let report = status::health(Utc::now());
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize health report")?;
    println!("{json}");
    Ok(())
}
