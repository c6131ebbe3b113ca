//! Simulation speed multipliers.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Speed multiplier applied to stage delays and the generation interval.
///
/// Larger values make the simulated wall clock run faster: every delay is
/// divided by the multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub enum Speed {
    /// 0.5x.
    Half,
    /// 1x.
    #[default]
    Normal,
    /// 2x.
    Double,
    /// 4x.
    Quad,
}

impl Speed {
    /// All accepted multipliers, slowest first.
    pub const PRESETS: [Self; 4] = [Self::Half, Self::Normal, Self::Double, Self::Quad];

    /// Returns the numeric multiplier.
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Half => 0.5,
            Self::Normal => 1.0,
            Self::Double => 2.0,
            Self::Quad => 4.0,
        }
    }

    /// Scales a nominal duration to wall-clock time at this speed.
    #[must_use]
    pub fn scale(self, nominal: Duration) -> Duration {
        nominal.div_f64(self.multiplier())
    }

    /// Scales a nominal delay in milliseconds to wall-clock time.
    #[must_use]
    pub fn scale_millis(self, nominal_ms: u64) -> Duration {
        self.scale(Duration::from_millis(nominal_ms))
    }
}

impl From<Speed> for f64 {
    fn from(speed: Speed) -> Self {
        speed.multiplier()
    }
}

impl TryFrom<f64> for Speed {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::PRESETS
            .into_iter()
            .find(|preset| (preset.multiplier() - value).abs() < f64::EPSILON)
            .ok_or_else(|| Error::InvalidSpeed {
                value: value.to_string(),
            })
    }
}

impl FromStr for Speed {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let numeric = trimmed
            .strip_suffix('x')
            .or_else(|| trimmed.strip_suffix('X'))
            .unwrap_or(trimmed);
        let value: f64 = numeric.parse().map_err(|_| Error::InvalidSpeed {
            value: s.to_string(),
        })?;
        Self::try_from(value).map_err(|_| Error::InvalidSpeed {
            value: s.to_string(),
        })
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.multiplier())
    }
}
