//! Error types for the tracker core.
//!
//! Invalid date text and empty records are not errors: those come back as
//! `Option`/`bool` from the engine so front ends can render them directly.

use thiserror::Error;

/// Errors raised by the registry, the record store and the engine.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// User identifier is not in the registry
    #[error("User not found: {user}")]
    UserNotFound { user: String },

    /// No record file exists for the user
    #[error("No record stored for user: {user}")]
    RecordNotFound { user: String },

    /// Identifier cannot be used as a record key
    #[error("Invalid user identifier: {user:?}")]
    InvalidUserId { user: String },

    /// Stored record could not be decoded
    #[error("Corrupt record for user '{user}': {reason}")]
    CorruptRecord { user: String, reason: String },

    /// Intervals no longer line up with dates; indicates a bug
    #[error("Record invariant violated: {dates} dates but {intervals} intervals")]
    InvariantViolation { dates: usize, intervals: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    /// Check if this error means the user or their record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TrackerError::UserNotFound { .. } | TrackerError::RecordNotFound { .. }
        )
    }
}

/// Result alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
