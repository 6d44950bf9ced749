//! Reconciliation errors.

use tally_shared::AppError;
use tally_shared::types::{AccountId, EntryId, StatementLineId};
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while linking entries to statement lines.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The entry is already reconciled.
    #[error("Entry {0} is already reconciled")]
    EntryAlreadyReconciled(EntryId),

    /// The statement line is already linked to an entry.
    #[error("Statement line {0} is already linked")]
    StatementAlreadyLinked(StatementLineId),

    /// No line of the entry sits on the statement's account with its amount.
    #[error("Entry {entry_id} has no line matching statement line {statement_line_id}")]
    NoMatchingLine {
        /// Entry looked at.
        entry_id: EntryId,
        /// Statement line to match.
        statement_line_id: StatementLineId,
    },

    /// Day window out of range.
    #[error("Reconciliation window must be between 0 and {max} days, got {days}")]
    InvalidWindow {
        /// Requested window.
        days: i64,
        /// Largest accepted window.
        max: i64,
    },

    /// Entry not found.
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Statement line not found.
    #[error("Statement line not found: {0}")]
    StatementLineNotFound(StatementLineId),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// The store rejected the link.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconcileError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EntryAlreadyReconciled(_) => "ENTRY_ALREADY_RECONCILED",
            Self::StatementAlreadyLinked(_) => "STATEMENT_ALREADY_LINKED",
            Self::NoMatchingLine { .. } => "NO_MATCHING_LINE",
            Self::InvalidWindow { .. } => "INVALID_WINDOW",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::StatementLineNotFound(_) => "STATEMENT_LINE_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Store(e) => e.error_code(),
        }
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::EntryAlreadyReconciled(_)
            | ReconcileError::StatementAlreadyLinked(_)
            | ReconcileError::NoMatchingLine { .. }
            | ReconcileError::InvalidWindow { .. } => Self::validation(err.to_string()),
            ReconcileError::EntryNotFound(_)
            | ReconcileError::StatementLineNotFound(_)
            | ReconcileError::AccountNotFound(_) => Self::NotFound(err.to_string()),
            ReconcileError::Store(e) => e.into(),
        }
    }
}
