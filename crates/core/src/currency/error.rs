//! FX rate table errors.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::AppError;
use tally_shared::types::CurrencyCode;
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by the FX rate table.
#[derive(Debug, Error)]
pub enum FxError {
    /// Exchange rate must be positive.
    #[error("Exchange rate must be positive, got {0}")]
    NonPositiveRate(Decimal),

    /// Base and quote are the same currency.
    #[error("Base and quote currencies must differ, both are {0}")]
    SameCurrency(CurrencyCode),

    /// No snapshot registered for the exact key.
    #[error("No exchange rate registered for {base}/{quote} at {as_of}")]
    Missing {
        /// Currency converted into.
        base: CurrencyCode,
        /// Currency converted from.
        quote: CurrencyCode,
        /// Instant looked up.
        as_of: DateTime<Utc>,
    },

    /// Converted amount does not fit in a `Decimal`.
    #[error("Converting {amount} at rate {rate} overflows")]
    Overflow {
        /// Amount being converted.
        amount: Decimal,
        /// Rate applied.
        rate: Decimal,
    },

    /// The backing store rejected the write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FxError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveRate(_) => "INVALID_EXCHANGE_RATE",
            Self::SameCurrency(_) => "SAME_CURRENCY_EXCHANGE",
            Self::Missing { .. } => "FX_MISSING",
            Self::Overflow { .. } => "CONVERSION_OVERFLOW",
            Self::Store(e) => e.error_code(),
        }
    }
}

impl From<FxError> for AppError {
    fn from(err: FxError) -> Self {
        match err {
            FxError::NonPositiveRate(_) | FxError::SameCurrency(_) | FxError::Overflow { .. } => {
                Self::validation(err.to_string())
            }
            FxError::Missing { .. } => Self::FxMissing(err.to_string()),
            FxError::Store(e) => e.into(),
        }
    }
}
