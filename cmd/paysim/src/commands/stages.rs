//! Stages command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use paysim_engine::status;

/// Prints the nominal stage profile.
pub fn run() -> Result<()> {
    let report = status::stage_profile(Utc::now());
    let json =
        serde_json::to_string_pretty(&report).context("Failed to serialize stage profile")?;
    println!("{json}");
    Ok(())
}
