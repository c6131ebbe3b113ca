//! Transaction simulation engine for the payment pipeline simulator.
//!
//! This crate provides:
//! - A transaction factory producing synthetic payments with a fraud score
//! - The stage policy: stage order, latency draws and failure decisions
//! - A driver that walks one transaction through the stages on tokio timers
//! - A reducer-style store holding history, retry queue and metrics
//! - The pipeline controller: auto-generation, speed, pause and retries
//!
//! # Example
//!
//! ```rust,ignore
//! use paysim_engine::{EngineConfig, Pipeline};
//! use paysim_model::Speed;
//!
//! let pipeline = Pipeline::new(EngineConfig::default().with_seed(42));
//! pipeline.set_speed(Speed::Double);
//! pipeline.run_scheduler(tokio::time::sleep(Duration::from_secs(30))).await;
//! println!("{}", pipeline.snapshot().metrics.throughput);
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod driver;
pub mod entropy;
pub mod error;
pub mod export;
pub mod factory;
pub mod pipeline;
pub mod policy;
pub mod status;
pub mod store;

pub use config::EngineConfig;
pub use driver::Driver;
pub use entropy::Entropy;
pub use error::{Error, Result};
pub use factory::{AmountRange, TransactionFactory};
pub use pipeline::Pipeline;
pub use policy::{next_stage, LatencyRange, StagePolicy};
pub use store::{reduce, Action, PipelineState, Store};
