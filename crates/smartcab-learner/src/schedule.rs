//! Per-trial exploration decay.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest value a positive epsilon decays to.
///
/// Compounding decay shrinks roughly like `1 / (n/100)!` and leaves the
/// range of `f64` after a few hundred trials.
pub const EPSILON_FLOOR: f64 = f64::MIN_POSITIVE;

/// How epsilon shrinks when a new trial starts.
///
/// Both variants divide by `1 + (trial_count − 1) / horizon`:
///
/// * `Compounding` divides the running (already decayed) epsilon.
/// * `Baseline` divides the initial epsilon from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecaySchedule {
    #[default]
    Compounding,
    Baseline,
}

impl DecaySchedule {
    /// Epsilon for the trial numbered `trial_count` (1-based).
    #[must_use]
    pub fn next(self, current: f64, initial: f64, trial_count: u64, horizon: f64) -> f64 {
        let base = match self {
            DecaySchedule::Compounding => current,
            DecaySchedule::Baseline => initial,
        };
        if base <= 0.0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let divisor = 1.0 + trial_count.saturating_sub(1) as f64 / horizon;
        (base / divisor).max(EPSILON_FLOOR)
    }
}

impl FromStr for DecaySchedule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compounding" => Ok(DecaySchedule::Compounding),
            "baseline" => Ok(DecaySchedule::Baseline),
            other => Err(format!(
                "unknown decay schedule {other:?} (expected compounding or baseline)"
            )),
        }
    }
}

impl fmt::Display for DecaySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecaySchedule::Compounding => "compounding",
            DecaySchedule::Baseline => "baseline",
        })
    }
}
