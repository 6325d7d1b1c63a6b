//! ε-greedy action selection.
//!
//! Kept free of any environment access so it can be exercised with nothing
//! but a value vector and a seeded RNG.

use crate::table::{max_of, ActionValues};
use rand::seq::SliceRandom;
use rand::Rng;
use smartcab_core::{Action, ACTION_COUNT};

/// Outcome of one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Index into [`Action::ALL`].
    pub index: usize,
    /// `true` when the exploration branch picked the action.
    pub explored: bool,
}

impl Selection {
    #[must_use]
    pub fn action(&self) -> Action {
        Action::ALL[self.index]
    }
}

/// With probability `epsilon` picks uniformly among all actions, otherwise
/// picks a maximizing action, breaking ties uniformly at random.
pub fn select_action<R: Rng + ?Sized>(
    values: &ActionValues,
    epsilon: f64,
    rng: &mut R,
) -> Selection {
    if rng.gen::<f64>() < epsilon {
        return Selection {
            index: rng.gen_range(0..ACTION_COUNT),
            explored: true,
        };
    }
    Selection {
        index: greedy_index(values, rng),
        explored: false,
    }
}

/// Index of a maximizing entry; ties are broken uniformly at random.
pub fn greedy_index<R: Rng + ?Sized>(values: &ActionValues, rng: &mut R) -> usize {
    let max = max_of(values);
    let best: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v == max)
        .map(|(i, _)| i)
        .collect();
    // all-NaN vectors have no maximum; fall back to the first action
    best.choose(rng).copied().unwrap_or(0)
}
