//! Statement import errors.
//!
//! Only batch-level problems surface here. Problems with a single row are
//! reported in the import report and never abort the batch.

use tally_shared::AppError;
use tally_shared::types::AccountId;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that abort a whole import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The target account does not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// A column named in the mapping is not in the header row.
    #[error("Column '{0}' is not in the header row")]
    MissingColumn(String),

    /// The mapping cannot be applied to this input.
    #[error("Invalid column mapping: {0}")]
    InvalidMapping(String),

    /// The input could not be read as delimited text.
    #[error("Malformed input: {0}")]
    Csv(#[from] csv::Error),

    /// The store failed outside of a single row.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ImportError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::MissingColumn(_) => "MISSING_COLUMN",
            Self::InvalidMapping(_) => "INVALID_MAPPING",
            Self::Csv(_) => "MALFORMED_INPUT",
            Self::Store(e) => e.error_code(),
        }
    }
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::AccountNotFound(_) => Self::NotFound(err.to_string()),
            ImportError::Store(e) => e.into(),
            ImportError::MissingColumn(_)
            | ImportError::InvalidMapping(_)
            | ImportError::Csv(_) => Self::validation(err.to_string()),
        }
    }
}
