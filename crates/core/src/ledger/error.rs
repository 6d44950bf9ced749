//! Ledger error types for entry building.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::AppError;
use tally_shared::types::{AccountId, CurrencyCode};
use thiserror::Error;

use super::types::Direction;
use crate::currency::FxError;
use crate::store::StoreError;

/// Errors that can occur while building an entry.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Input is malformed. Lists every problem found.
    #[error("Invalid entry: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Entry does not sum to zero in the base currency.
    #[error("Entry is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total booked debit magnitude.
        debit: Decimal,
        /// Total booked credit magnitude.
        credit: Decimal,
    },

    /// Booked amount sign disagrees with the line direction.
    #[error("Line {line}: {direction} line has booked amount {booked}")]
    Direction {
        /// 1-based line number.
        line: usize,
        /// Declared direction.
        direction: Direction,
        /// Offending booked amount.
        booked: Decimal,
    },

    // ========== Currency Errors ==========
    /// Explicit base currency on a line differs from the entry base currency.
    #[error("Line {line}: base currency {line_currency} differs from entry base {entry_currency}")]
    BaseCurrency {
        /// 1-based line number.
        line: usize,
        /// Currency given on the line.
        line_currency: CurrencyCode,
        /// Entry base currency.
        entry_currency: CurrencyCode,
    },

    /// Native currency differs from the account currency.
    #[error("Line {line}: native currency {native_currency} differs from account {account_id} currency {account_currency}")]
    CurrencyMismatch {
        /// 1-based line number.
        line: usize,
        /// Account posted to.
        account_id: AccountId,
        /// Account currency.
        account_currency: CurrencyCode,
        /// Currency given on the line.
        native_currency: CurrencyCode,
    },

    /// No rate registered for the exact booking instant.
    #[error("No exchange rate registered for {base}/{quote} at {as_of}")]
    FxMissing {
        /// Entry base currency.
        base: CurrencyCode,
        /// Line native currency.
        quote: CurrencyCode,
        /// Booking instant.
        as_of: DateTime<Utc>,
    },

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    // ========== Storage Errors ==========
    /// The store rejected the write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Single-reason validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unbalanced { .. } => "UNBALANCED_ENTRY",
            Self::Direction { .. } => "DIRECTION_ERROR",
            Self::BaseCurrency { .. } => "BASE_CURRENCY_ERROR",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::FxMissing { .. } => "FX_MISSING",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Store(e) => e.error_code(),
        }
    }
}

impl From<FxError> for LedgerError {
    fn from(err: FxError) -> Self {
        match err {
            FxError::Missing { base, quote, as_of } => Self::FxMissing { base, quote, as_of },
            FxError::Store(e) => Self::Store(e),
            other => Self::validation(other.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(reasons) => Self::Validation(reasons),
            LedgerError::Unbalanced { .. } => Self::UnbalancedEntry(err.to_string()),
            LedgerError::Direction { .. } => Self::Direction(err.to_string()),
            LedgerError::BaseCurrency { .. } => Self::BaseCurrency(err.to_string()),
            LedgerError::CurrencyMismatch { .. } => Self::CurrencyMismatch(err.to_string()),
            LedgerError::FxMissing { .. } => Self::FxMissing(err.to_string()),
            LedgerError::AccountNotFound(_) => Self::NotFound(err.to_string()),
            LedgerError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::Unbalanced {
                debit: dec!(100),
                credit: dec!(50)
            }
            .error_code(),
            "UNBALANCED_ENTRY"
        );
        assert_eq!(
            LedgerError::AccountNotFound(AccountId::new()).error_code(),
            "ACCOUNT_NOT_FOUND"
        );
        assert_eq!(
            LedgerError::Store(StoreError::duplicate("entry", "x")).error_code(),
            "DUPLICATE"
        );
    }

    #[test]
    fn test_maps_into_app_error_taxonomy() {
        let err = LedgerError::Direction {
            line: 2,
            direction: Direction::Credit,
            booked: dec!(5),
        };
        assert_eq!(err.to_string(), "Line 2: credit line has booked amount 5");
        assert!(matches!(AppError::from(err), AppError::Direction(_)));

        let not_found = AppError::from(LedgerError::AccountNotFound(AccountId::new()));
        assert_eq!(not_found.status_code(), 404);
    }

    #[test]
    fn test_fx_missing_converts() {
        let mxn = CurrencyCode::parse("MXN").unwrap();
        let usd = CurrencyCode::parse("USD").unwrap();
        let err = LedgerError::from(FxError::Missing {
            base: mxn,
            quote: usd,
            as_of: Utc::now(),
        });
        assert!(matches!(err, LedgerError::FxMissing { .. }));
        assert!(matches!(
            LedgerError::from(FxError::NonPositiveRate(dec!(-1))),
            LedgerError::Validation(_)
        ));
    }
}
