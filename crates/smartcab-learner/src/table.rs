//! Action-value table over the full, pre-enumerated state space.

use crate::error::{LearnerError, Result};
use smartcab_core::{Action, State, ACTION_COUNT};
use std::collections::HashMap;

/// Value estimates for one state, indexed like [`Action::ALL`].
pub type ActionValues = [f64; ACTION_COUNT];

/// Before/after values of a single temporal-difference update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TdUpdate {
    pub before: f64,
    pub after: f64,
}

/// Q-table keyed by [`State`].
///
/// Every state exists from construction on; entries are only ever mutated
/// through [`QTable::update`]. A lookup miss is an invariant breach and is
/// reported as [`LearnerError::MissingState`].
#[derive(Debug, Clone)]
pub struct QTable {
    values: HashMap<State, ActionValues>,
}

impl Default for QTable {
    fn default() -> Self {
        Self::new()
    }
}

impl QTable {
    /// Builds the table with a zero vector for every state.
    #[must_use]
    pub fn new() -> Self {
        let values = State::all()
            .map(|state| (state, [0.0; ACTION_COUNT]))
            .collect();
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self, state: &State) -> Result<&ActionValues> {
        self.values
            .get(state)
            .ok_or(LearnerError::MissingState(*state))
    }

    pub fn value(&self, state: &State, action: Action) -> Result<f64> {
        Ok(self.values(state)?[action.index()])
    }

    /// Largest value over all actions of `state`.
    pub fn max_value(&self, state: &State) -> Result<f64> {
        Ok(max_of(self.values(state)?))
    }

    /// One-step Q-learning:
    /// `Q(s,a) ← Q(s,a) + α·(r + γ·max_a' Q(s',a') − Q(s,a))`.
    pub fn update(
        &mut self,
        state: &State,
        action: Action,
        reward: f64,
        next_state: &State,
        alpha: f64,
        gamma: f64,
    ) -> Result<TdUpdate> {
        let max_next = self.max_value(next_state)?;
        let q = self
            .values
            .get_mut(state)
            .ok_or(LearnerError::MissingState(*state))?;
        let slot = &mut q[action.index()];
        let before = *slot;
        *slot += alpha * (reward + gamma * max_next - before);
        Ok(TdUpdate {
            before,
            after: *slot,
        })
    }

    /// States whose vector has moved away from all zeros, in index order.
    #[must_use]
    pub fn learned(&self) -> Vec<(State, ActionValues)> {
        let mut rows: Vec<_> = self
            .values
            .iter()
            .filter(|(_, v)| v.iter().any(|x| *x != 0.0))
            .map(|(s, v)| (*s, *v))
            .collect();
        rows.sort_by_key(|(s, _)| s.index());
        rows
    }
}

pub(crate) fn max_of(values: &ActionValues) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcab_core::Light;

    fn state(waypoint: Action, light: Light) -> State {
        State {
            waypoint,
            light,
            oncoming: Action::None,
            left: Action::None,
            right: Action::None,
        }
    }

    #[test]
    fn table_covers_every_state_with_zeros() {
        let table = QTable::new();
        assert_eq!(table.len(), State::COUNT);
        for s in State::all() {
            let v = table.values(&s).expect("enumerated");
            assert_eq!(v.len(), Action::ALL.len());
            assert!(v.iter().all(|x| *x == 0.0));
        }
        assert!(table.learned().is_empty());
    }

    #[test]
    fn update_matches_worked_example() {
        let mut table = QTable::new();
        let s = state(Action::Forward, Light::Green);
        let next = state(Action::Left, Light::Red);

        let upd = table
            .update(&s, Action::Forward, 2.0, &next, 0.8, 0.4)
            .expect("known states");
        assert_eq!(upd.before, 0.0);
        assert!((upd.after - 1.6).abs() < 1e-12);
        assert!((table.value(&s, Action::Forward).unwrap() - 1.6).abs() < 1e-12);
        // other entries untouched
        assert_eq!(table.value(&s, Action::None).unwrap(), 0.0);
        assert_eq!(table.max_value(&next).unwrap(), 0.0);
    }

    #[test]
    fn update_discounts_successor_maximum() {
        let mut table = QTable::new();
        let s = state(Action::Forward, Light::Red);
        let next = state(Action::Right, Light::Green);
        let terminal = state(Action::None, Light::Green);

        // successor gets a single positive entry: 0.5 * 1.0 = 0.5
        table
            .update(&next, Action::Right, 1.0, &terminal, 0.5, 0.0)
            .unwrap();
        table
            .update(&next, Action::Left, -3.0, &terminal, 0.5, 0.0)
            .unwrap();
        assert!((table.max_value(&next).unwrap() - 0.5).abs() < 1e-12);

        let upd = table
            .update(&s, Action::None, 0.0, &next, 0.5, 0.9)
            .unwrap();
        assert!((upd.after - 0.5 * 0.9 * 0.5).abs() < 1e-12);

        let learned = table.learned();
        assert_eq!(learned.len(), 2);
        assert!(learned[0].0.index() < learned[1].0.index());
    }

    #[test]
    fn missing_state_is_reported() {
        let mut table = QTable::new();
        let s = state(Action::Forward, Light::Red);
        table.values.remove(&s);

        match table.values(&s) {
            Err(LearnerError::MissingState(missing)) => assert_eq!(missing, s),
            other => panic!("expected MissingState, got {other:?}"),
        }
        let other = state(Action::Left, Light::Red);
        assert!(table
            .update(&other, Action::Left, 1.0, &s, 0.5, 0.5)
            .is_err());
        // a failed update must not touch the source entry
        assert_eq!(table.value(&other, Action::Left).unwrap(), 0.0);
    }
}
