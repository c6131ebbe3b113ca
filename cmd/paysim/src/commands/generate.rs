//! Generate command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use paysim_engine::{Entropy, TransactionFactory};

/// Prints `count` generated transactions, one JSON document per line.
pub fn run(count: usize, seed: Option<u64>) -> Result<()> {
    let factory = TransactionFactory::new();
    let entropy = Entropy::new(seed);

    for _ in 0..count {
        let tx = entropy.with(|rng| factory.create(rng, Utc::now()));
        let json = serde_json::to_string(&tx).context("Failed to serialize transaction")?;
        println!("{json}");
    }

    Ok(())
}
