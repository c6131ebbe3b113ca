//! Run command implementation.
//!
//! Drives the scheduler for a fixed window, logs a metrics summary at a
//! fixed interval, then optionally retries failures and exports the state.

use anyhow::{Context, Result};
use chrono::Utc;
use paysim_engine::{export, EngineConfig, Pipeline, PipelineState};
use paysim_model::{format_latency, Speed};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

const SETTLE_POLL: Duration = Duration::from_millis(100);

/// Options for the run command.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Length of the scheduling window in seconds.
    pub duration_secs: u64,
    /// Initial speed.
    pub speed: Speed,
    /// Seed for reproducible runs.
    pub seed: Option<u64>,
    /// Start with auto-generation paused.
    pub paused: bool,
    /// Transactions submitted immediately.
    pub burst: usize,
    /// Resubmit queued failures after the window.
    pub retry_failed: bool,
    /// Summary interval in seconds; 0 disables the summary.
    pub report_every_secs: u64,
    /// JSON export path.
    pub export_json: Option<PathBuf>,
    /// CSV export path.
    pub export_csv: Option<PathBuf>,
}

/// Runs the simulation.
pub async fn run(options: &RunOptions) -> Result<()> {
    let mut config = EngineConfig::new().with_speed(options.speed);
    if let Some(seed) = options.seed {
        config = config.with_seed(seed);
    }
    if options.paused {
        config = config.paused();
    }
    let pipeline = Pipeline::new(config);

    info!(
        "Starting pipeline at {} for {}s (seed: {})",
        options.speed,
        options.duration_secs,
        pipeline
            .seed()
            .map_or_else(|| "random".to_string(), |s| s.to_string())
    );

    for _ in 0..options.burst {
        drop(pipeline.add_transaction_now());
    }

    let window = Duration::from_secs(options.duration_secs);
    let shutdown = async {
        tokio::select! {
            () = tokio::time::sleep(window) => {
                info!("Run window elapsed");
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Received shutdown signal");
            }
        }
    };

    tokio::select! {
        () = pipeline.run_scheduler(shutdown) => {}
        () = report_loop(&pipeline, options.report_every_secs) => {}
    }

    pipeline.set_running(false);
    info!("Waiting for in-flight transactions");
    pipeline.settle(SETTLE_POLL).await;

    if options.retry_failed {
        let retried = pipeline.retry_all();
        info!("Retrying {} failed transaction(s)", retried.len());
        for handle in retried {
            handle.await.context("Retry run panicked")?;
        }
    }

    let state = pipeline.snapshot();
    report(&state);

    if let Some(path) = &options.export_json {
        export::write_json_file(&state, Utc::now(), path)
            .with_context(|| format!("Failed to write JSON export: {}", path.display()))?;
        info!("Wrote {}", path.display());
    }
    if let Some(path) = &options.export_csv {
        export::write_csv_file(&state, path)
            .with_context(|| format!("Failed to write CSV export: {}", path.display()))?;
        info!("Wrote {}", path.display());
    }

    Ok(())
}

async fn report_loop(pipeline: &Pipeline, every_secs: u64) {
    if every_secs == 0 {
        std::future::pending::<()>().await;
    }
    let mut ticker = interval(Duration::from_secs(every_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        report(&pipeline.snapshot());
    }
}

fn report(state: &PipelineState) {
    let metrics = &state.metrics;
    info!(
        "Transactions: {} total, {} completed, {} failed | throughput {}% | avg {}",
        metrics.total_transactions,
        metrics.successful_transactions,
        metrics.failed_transactions,
        metrics.throughput,
        format_latency(metrics.avg_processing_time)
    );

    let active: Vec<String> = metrics
        .stages
        .iter()
        .map(|stage| format!("{} {}", stage.name, stage.active_transactions))
        .collect();
    info!(
        "Active: {} | retry queue: {} | {}",
        active.join(", "),
        state.retry_queue.len(),
        if state.is_running { "running" } else { "paused" }
    );
}
