//! Shared random source.
//!
//! Every random draw in the engine goes through one seeded `ChaCha8Rng`, so
//! a run with a fixed seed reproduces the same transactions and decisions
//! for the same interleaving of driver runs.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Cloneable handle to the engine's random number generator.
#[derive(Clone)]
pub struct Entropy {
    seed: Option<u64>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl Entropy {
    /// Creates a source seeded with `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Creates a source seeded from the operating system.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            seed: None,
            rng: Arc::new(Mutex::new(ChaCha8Rng::from_entropy())),
        }
    }

    /// Creates a seeded source if `seed` is set, an OS-seeded one otherwise.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// Returns the seed, if one was given.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Runs `f` with exclusive access to the generator.
    ///
    /// The lock is released before this returns; never hold it across an
    /// await point.
    pub fn with<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

impl fmt::Debug for Entropy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entropy")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}
