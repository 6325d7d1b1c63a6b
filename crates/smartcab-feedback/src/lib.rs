#![warn(clippy::unwrap_used, clippy::expect_used)]

//! Retrospective analysis of smartcab training trials.
//!
//! The driving loop records one [`TrialOutcome`] per trial. This crate
//! aggregates them into statistics, a windowed learning curve and a few
//! heuristic findings, and reads/writes the trial log the CLI keeps on disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

// Pattern detection thresholds
/// Success-rate difference between first and last window that counts as a trend
const PATTERN_TREND_THRESHOLD: f64 = 0.2;
/// Penalties per step above which the penalty rate is flagged
const PATTERN_HIGH_PENALTY_RATE: f64 = 0.2;
/// Overall success rate below which training is flagged as poor
const PATTERN_LOW_SUCCESS_THRESHOLD: f64 = 0.5;

/// Version of the report format
const REPORT_VERSION: &str = "0.1.0";
/// Fallback timestamp when formatting fails
const FALLBACK_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Trial log (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid trial outcome: {0}")]
    InvalidOutcome(String),
}

pub type Result<T> = std::result::Result<T, FeedbackError>;

/// How a trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialEnd {
    /// Destination reached.
    Reached,
    /// Deadline ran out first.
    Expired,
    /// The driver stopped the trial with deadline left (e.g. end of a script).
    Aborted,
}

/// Summary of a single trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    /// Trial number (1-based)
    pub trial: u64,
    /// Timestamp when the trial finished
    pub ts: String,
    pub end: TrialEnd,
    /// Decision steps taken
    pub steps: u32,
    /// Sum of rewards over the trial
    pub net_reward: f64,
    /// Steps with a negative reward
    pub penalties: u32,
    /// Deadline left when the trial ended
    pub deadline_remaining: i64,
    /// Exploration probability in effect during the trial
    pub epsilon: f64,
}

impl TrialOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        self.end == TrialEnd::Reached
    }
}

/// Statistics aggregated from trial outcomes.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct OutcomeStatistics {
    /// Total number of trials (successes + failures).
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub total_reward: f64,
    pub total_steps: u64,
    pub total_penalties: u64,
}

impl OutcomeStatistics {
    fn record(&mut self, outcome: &TrialOutcome) {
        self.total += 1;
        if outcome.success() {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        if outcome.net_reward.is_finite() {
            self.total_reward += outcome.net_reward;
        }
        self.total_steps += u64::from(outcome.steps);
        self.total_penalties += u64::from(outcome.penalties);
    }

    /// Calculate success rate (0.0 to 1.0).
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.successes as f64 / self.total as f64
        }
    }

    /// Calculate failure rate (0.0 to 1.0).
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        debug_assert!(
            self.successes + self.failures == self.total,
            "OutcomeStatistics totals are inconsistent"
        );
        if self.total == 0 {
            return 0.0;
        }
        1.0 - self.success_rate()
    }

    /// Average net reward per trial.
    #[must_use]
    pub fn average_reward(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.total_reward / self.total as f64
        }
    }

    /// Penalties per decision step.
    #[must_use]
    pub fn penalty_rate(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.total_penalties as f64 / self.total_steps as f64
        }
    }
}

/// One point of the learning curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStats {
    pub first_trial: u64,
    pub last_trial: u64,
    pub success_rate: f64,
    pub average_reward: f64,
    pub penalty_rate: f64,
}

/// Serializable analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct TrialReport {
    pub version: String,
    pub ts: String,
    pub trials_analyzed: usize,
    pub overall: OutcomeStatistics,
    pub success_rate: f64,
    pub penalty_rate: f64,
    pub by_end: BTreeMap<String, usize>,
    pub learning_curve: Vec<WindowStats>,
    pub patterns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_epsilon: Option<f64>,
}

/// Analyzes trial outcomes of a training run.
#[derive(Debug)]
pub struct TrialAnalyzer {
    /// Minimum number of trials before patterns are reported
    min_trials: usize,
    /// Trials per learning-curve window
    window: usize,
}

impl Default for TrialAnalyzer {
    fn default() -> Self {
        Self {
            min_trials: 10,
            window: 10,
        }
    }
}

impl TrialAnalyzer {
    #[must_use]
    pub fn new(min_trials: usize, window: usize) -> Self {
        Self {
            min_trials,
            window: window.max(1),
        }
    }

    #[must_use]
    pub fn summarize(&self, outcomes: &[TrialOutcome]) -> OutcomeStatistics {
        let mut stats = OutcomeStatistics::default();
        for outcome in outcomes {
            stats.record(outcome);
        }
        stats
    }

    /// Success rate, average reward and penalty rate per consecutive window.
    #[must_use]
    pub fn learning_curve(&self, outcomes: &[TrialOutcome]) -> Vec<WindowStats> {
        outcomes
            .chunks(self.window)
            .filter_map(|chunk| {
                let first = chunk.first()?;
                let last = chunk.last()?;
                let stats = self.summarize(chunk);
                Some(WindowStats {
                    first_trial: first.trial,
                    last_trial: last.trial,
                    success_rate: stats.success_rate(),
                    average_reward: stats.average_reward(),
                    penalty_rate: stats.penalty_rate(),
                })
            })
            .collect()
    }

    /// Heuristic findings about the run.
    #[must_use]
    pub fn analyze_patterns(&self, outcomes: &[TrialOutcome]) -> Vec<String> {
        let mut patterns = Vec::new();

        if outcomes.len() < self.min_trials {
            return patterns;
        }

        // Pattern 1: trend between first and last window
        let curve = self.learning_curve(outcomes);
        if let (Some(first), Some(last)) = (curve.first(), curve.last()) {
            let delta = last.success_rate - first.success_rate;
            if curve.len() >= 2 && delta.abs() >= PATTERN_TREND_THRESHOLD {
                patterns.push(format!(
                    "Success rate {} from {:.1}% (trials {}-{}) to {:.1}% (trials {}-{})",
                    if delta > 0.0 { "improved" } else { "dropped" },
                    first.success_rate * 100.0,
                    first.first_trial,
                    first.last_trial,
                    last.success_rate * 100.0,
                    last.first_trial,
                    last.last_trial
                ));
            }
        }

        let overall = self.summarize(outcomes);

        // Pattern 2: frequent traffic violations
        if overall.penalty_rate() > PATTERN_HIGH_PENALTY_RATE {
            patterns.push(format!(
                "Penalty rate is high ({:.1}% of steps)",
                overall.penalty_rate() * 100.0
            ));
        }

        // Pattern 3: overall poor performance
        if overall.success_rate() < PATTERN_LOW_SUCCESS_THRESHOLD {
            patterns.push(format!(
                "Overall success rate is low ({:.1}%)",
                overall.success_rate() * 100.0
            ));
        }

        // Pattern 4: clean finish
        if let Some(tail) = outcomes.rchunks(self.window).next() {
            if tail.len() == self.window && tail.iter().all(|o| o.success() && o.penalties == 0) {
                patterns.push(format!(
                    "Last {} trials reached the destination without penalties",
                    tail.len()
                ));
            }
        }

        patterns
    }

    #[must_use]
    pub fn report(&self, outcomes: &[TrialOutcome]) -> TrialReport {
        let overall = self.summarize(outcomes);
        let mut by_end = BTreeMap::new();
        for outcome in outcomes {
            let key = serde_json::to_value(outcome.end)
                .ok()
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_else(|| format!("{:?}", outcome.end));
            *by_end.entry(key).or_insert(0) += 1;
        }

        TrialReport {
            version: REPORT_VERSION.to_string(),
            ts: timestamp_now(),
            trials_analyzed: outcomes.len(),
            success_rate: overall.success_rate(),
            penalty_rate: overall.penalty_rate(),
            overall,
            by_end,
            learning_curve: self.learning_curve(outcomes),
            patterns: self.analyze_patterns(outcomes),
            final_epsilon: outcomes.last().map(|o| o.epsilon),
        }
    }
}

/// Trial outcomes of one training run, as kept on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialLog {
    pub last_updated: String,
    pub outcomes: Vec<TrialOutcome>,
}

impl TrialLog {
    #[must_use]
    pub fn new(outcomes: Vec<TrialOutcome>) -> Self {
        Self {
            last_updated: timestamp_now(),
            outcomes,
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let log: TrialLog = serde_json::from_reader(reader)?;
        log.validate()?;
        Ok(log)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let mut prev = 0;
        for o in &self.outcomes {
            if o.trial <= prev {
                return Err(FeedbackError::InvalidOutcome(format!(
                    "trial {} follows trial {prev}",
                    o.trial
                )));
            }
            if !o.net_reward.is_finite() || !(0.0..=1.0).contains(&o.epsilon) {
                return Err(FeedbackError::InvalidOutcome(format!(
                    "trial {} has net_reward {} and epsilon {}",
                    o.trial, o.net_reward, o.epsilon
                )));
            }
            prev = o.trial;
        }
        Ok(())
    }
}

/// Current time as RFC 3339.
#[must_use]
pub fn timestamp_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| FALLBACK_TIMESTAMP.to_string())
}
