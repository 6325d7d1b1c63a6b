//! Learner hyper-parameters.

use crate::error::{LearnerError, Result};
use crate::schedule::DecaySchedule;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ALPHA: f64 = 0.8;
pub const DEFAULT_GAMMA: f64 = 0.4;
pub const DEFAULT_EPSILON: f64 = 0.3;
/// Trials after which the decay divisor has grown by one.
pub const DEFAULT_DECAY_HORIZON: f64 = 100.0;

/// Hyper-parameters of a [`QLearningAgent`](crate::QLearningAgent).
///
/// Missing fields in a JSON config fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Learning rate in (0, 1].
    pub alpha: f64,
    /// Discount factor in [0, 1].
    pub gamma: f64,
    /// Initial exploration probability in [0, 1].
    pub epsilon: f64,
    pub decay: DecaySchedule,
    pub decay_horizon: f64,
    /// RNG seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            gamma: DEFAULT_GAMMA,
            epsilon: DEFAULT_EPSILON,
            decay: DecaySchedule::default(),
            decay_horizon: DEFAULT_DECAY_HORIZON,
            seed: None,
        }
    }
}

impl LearnerConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(LearnerError::InvalidConfig(msg));

        if !(self.alpha.is_finite() && self.alpha > 0.0 && self.alpha <= 1.0) {
            return invalid(format!("alpha must be in (0, 1], got {}", self.alpha));
        }
        if !(self.gamma.is_finite() && (0.0..=1.0).contains(&self.gamma)) {
            return invalid(format!("gamma must be in [0, 1], got {}", self.gamma));
        }
        if !(self.epsilon.is_finite() && (0.0..=1.0).contains(&self.epsilon)) {
            return invalid(format!("epsilon must be in [0, 1], got {}", self.epsilon));
        }
        if !(self.decay_horizon.is_finite() && self.decay_horizon > 0.0) {
            return invalid(format!(
                "decay_horizon must be positive, got {}",
                self.decay_horizon
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_valid() {
        let cfg = LearnerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.decay, DecaySchedule::Compounding);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: LearnerConfig =
            serde_json::from_value(json!({"epsilon": 0.1, "decay": "baseline", "seed": 42}))
                .expect("valid config");
        assert_eq!(cfg.alpha, DEFAULT_ALPHA);
        assert_eq!(cfg.epsilon, 0.1);
        assert_eq!(cfg.decay, DecaySchedule::Baseline);
        assert_eq!(cfg.seed, Some(42));
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let bad = [
            LearnerConfig {
                alpha: 0.0,
                ..LearnerConfig::default()
            },
            LearnerConfig {
                gamma: 1.5,
                ..LearnerConfig::default()
            },
            LearnerConfig {
                epsilon: f64::NAN,
                ..LearnerConfig::default()
            },
            LearnerConfig {
                decay_horizon: 0.0,
                ..LearnerConfig::default()
            },
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.validate(), Err(LearnerError::InvalidConfig(_))),
                "{cfg:?} should be rejected"
            );
        }
    }
}
