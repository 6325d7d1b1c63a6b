use thiserror::Error;

/// A perceived value fell outside its declared finite domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Unknown action symbol: {0:?}")]
    UnknownAction(String),
    #[error("Unknown traffic light color: {0:?}")]
    UnknownLight(String),
}
