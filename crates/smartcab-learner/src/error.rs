use smartcab_core::{Action, State};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LearnerError {
    /// The table was not enumerated over the full state space.
    #[error("State {0} is missing from the action-value table")]
    MissingState(State),
    #[error("Environment action domain {found:?} does not match {expected:?}")]
    ActionDomainMismatch {
        expected: Vec<Action>,
        found: Vec<Action>,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LearnerError>;
