//! Paysim CLI - simulated multi-stage payment pipeline.
//!
//! Commands:
//! - `paysim run` - Run the simulation and report pipeline metrics
//! - `paysim generate` - Print freshly generated transactions
//! - `paysim health` - Print the health payload
//! - `paysim stages` - Print the nominal stage profile

use anyhow::Result;
use clap::{Parser, Subcommand};
use paysim_model::Speed;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "paysim")]
#[command(about = "Simulated multi-stage payment processing pipeline")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline simulation
    Run {
        /// How long to run the scheduler, in seconds
        #[arg(short, long, default_value_t = 30)]
        duration: u64,

        /// Speed multiplier (0.5, 1, 2 or 4)
        #[arg(short, long, env = "PAYSIM_SPEED", default_value = "1")]
        speed: Speed,

        /// Seed for reproducible runs
        #[arg(long, env = "PAYSIM_SEED")]
        seed: Option<u64>,

        /// Start with auto-generation paused
        #[arg(long)]
        paused: bool,

        /// Submit this many transactions immediately
        #[arg(short, long, default_value_t = 0)]
        burst: usize,

        /// Resubmit every queued failure once the run window ends
        #[arg(long)]
        retry_failed: bool,

        /// Log a metrics summary every N seconds (0 disables)
        #[arg(long, default_value_t = 5)]
        report_every: u64,

        /// Write a JSON export here after the run
        #[arg(long)]
        export_json: Option<PathBuf>,

        /// Write a CSV export here after the run
        #[arg(long)]
        export_csv: Option<PathBuf>,
    },

    /// Print freshly generated transactions as JSON
    Generate {
        /// Number of transactions
        #[arg(short, long, default_value_t = 1)]
        count: usize,

        /// Seed for reproducible output
        #[arg(long, env = "PAYSIM_SEED")]
        seed: Option<u64>,
    },

    /// Print the health payload
    Health,

    /// Print the nominal stage profile
    Stages,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            duration,
            speed,
            seed,
            paused,
            burst,
            retry_failed,
            report_every,
            export_json,
            export_csv,
        } => {
            commands::run::run(&commands::run::RunOptions {
                duration_secs: duration,
                speed,
                seed,
                paused,
                burst,
                retry_failed,
                report_every_secs: report_every,
                export_json,
                export_csv,
            })
            .await
        }
        Commands::Generate { count, seed } => commands::generate::run(count, seed),
        Commands::Health => commands::health::run(),
        Commands::Stages => commands::stages::run(),
    }
}
