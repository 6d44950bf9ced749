//! Storage error types.

use tally_shared::AppError;
use thiserror::Error;

use super::models::EntryStatus;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Repository store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The entity failed shape validation. Lists every violation.
    #[error("invalid {entity}: {}", violations.join("; "))]
    Validation {
        /// Kind of entity rejected.
        entity: &'static str,
        /// Every problem found.
        violations: Vec<String>,
    },

    /// No entity with this id.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity looked up.
        entity: &'static str,
        /// The id or key looked up.
        id: String,
    },

    /// Id or uniqueness key already taken.
    #[error("{entity} already exists: {key}")]
    Duplicate {
        /// Kind of entity written.
        entity: &'static str,
        /// The colliding id or key.
        key: String,
    },

    /// Status change not allowed by the entry lifecycle.
    #[error("entry cannot move from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: EntryStatus,
        /// Requested status.
        to: EntryStatus,
    },
}

impl StoreError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a duplicate error.
    #[must_use]
    pub fn duplicate(entity: &'static str, key: impl ToString) -> Self {
        Self::Duplicate {
            entity,
            key: key.to_string(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Duplicate { .. } => "DUPLICATE",
            Self::InvalidTransition { .. } => "INVALID_STATUS_TRANSITION",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation { entity, violations } => Self::Validation(
                violations
                    .into_iter()
                    .map(|v| format!("{entity}: {v}"))
                    .collect(),
            ),
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Duplicate { .. } => Self::Duplicate(err.to_string()),
            StoreError::InvalidTransition { .. } => Self::validation(err.to_string()),
        }
    }
}
