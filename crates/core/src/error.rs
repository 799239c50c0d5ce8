// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// Trusted time fetch failed (recovered by the local-clock fallback)
    #[error("Time source unavailable: {0}")]
    TimeSourceUnavailable(String),

    /// Store query failed or timed out
    #[error("Fetch failure: {0}")]
    FetchFailure(String),

    #[error("Malformed wait allotment {value:?} on entry {entry_id}")]
    MalformedWaitAllotment { entry_id: String, value: String },

    /// Reap-phase store deletion failed (logged, never surfaced)
    #[error("Delete failure for entry {entry_id}: {reason}")]
    DeleteFailure { entry_id: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl AppError {
    /// Errors that change what the user sees (stale queue indicator)
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            AppError::FetchFailure(_) | AppError::MalformedWaitAllotment { .. }
        )
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error and reqwest::Error conversions are handled in the infra crates
// by converting to AppError::Database / AppError::TimeSourceUnavailable (String)
