//! Engine configuration.

use crate::factory::TransactionFactory;
use crate::policy::StagePolicy;
use crate::store::DEFAULT_HISTORY_LIMIT;
use paysim_model::Speed;
use std::time::Duration;

/// Nominal interval between auto-generated transactions at 1x speed.
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_millis(2_000);

/// Configuration for a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seed for every random draw; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Interval between auto-generated transactions at 1x speed.
    pub base_interval: Duration,
    /// Maximum number of transactions kept in history.
    pub history_limit: usize,
    /// Whether auto-generation starts enabled.
    pub start_running: bool,
    /// Initial speed multiplier.
    pub speed: Speed,
    /// Transaction generator.
    pub factory: TransactionFactory,
    /// Stage latencies and failure decisions.
    pub policy: StagePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            base_interval: DEFAULT_BASE_INTERVAL,
            history_limit: DEFAULT_HISTORY_LIMIT,
            start_running: true,
            speed: Speed::Normal,
            factory: TransactionFactory::default(),
            policy: StagePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the nominal generation interval.
    #[must_use]
    pub fn with_base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    /// Sets the history cap. A cap of zero keeps nothing.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Starts with auto-generation disabled.
    #[must_use]
    pub fn paused(mut self) -> Self {
        self.start_running = false;
        self
    }

    /// Sets the initial speed.
    #[must_use]
    pub fn with_speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    /// Replaces the transaction generator.
    #[must_use]
    pub fn with_factory(mut self, factory: TransactionFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Replaces the stage policy.
    #[must_use]
    pub fn with_policy(mut self, policy: StagePolicy) -> Self {
        self.policy = policy;
        self
    }
}
