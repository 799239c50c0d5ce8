// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Malformed wait allotment: {0:?} (expected \"HH:MM\")")]
    MalformedWaitAllotment(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
