//! Diagnostic record emitted for every decision step.
//!
//! The record carries no contract beyond visibility: the CLI writes it as
//! one JSON line per step, and tests use it to see which action was taken
//! and how the table entry moved.

use crate::state::{Action, Perception, State};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Trial the step belongs to (1-based).
    pub trial: u64,
    /// Remaining timesteps as reported before acting.
    pub deadline: i64,
    pub state: State,
    /// Perception the state was encoded from.
    pub inputs: Perception,
    pub action: Action,
    /// `true` when the action came from the exploration branch.
    pub explored: bool,
    pub reward: f64,
    /// Value of (state, action) before the update.
    pub q_before: f64,
    /// Value of (state, action) after the update.
    pub q_after: f64,
}

impl StepRecord {
    /// A negative reward marks a traffic violation or a wasted move.
    #[must_use]
    pub fn is_penalty(&self) -> bool {
        self.reward < 0.0
    }
}
