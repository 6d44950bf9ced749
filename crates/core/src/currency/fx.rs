//! FX rate table backed by the repository store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::types::CurrencyCode;
use tracing::debug;

use super::conversion::convert_booked;
use super::error::FxError;
use super::exchange::FxRate;
use crate::store::LedgerStore;

/// Registers and looks up rate snapshots.
///
/// Lookups are exact on the as-of instant. There is no nearest-date fallback.
pub struct FxRateTable<'a, S> {
    store: &'a S,
}

impl<'a, S: LedgerStore> FxRateTable<'a, S> {
    /// Wraps a store.
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Validates and stores a snapshot.
    ///
    /// A later call with the same (base, quote, as-of) replaces the rate.
    ///
    /// # Errors
    ///
    /// Returns [`FxError::NonPositiveRate`] or [`FxError::SameCurrency`] for
    /// invalid input.
    pub fn ensure(
        &self,
        base: CurrencyCode,
        quote: CurrencyCode,
        as_of: DateTime<Utc>,
        rate: Decimal,
    ) -> Result<FxRate, FxError> {
        if rate <= Decimal::ZERO {
            return Err(FxError::NonPositiveRate(rate));
        }
        if base == quote {
            return Err(FxError::SameCurrency(base));
        }
        let snapshot = self.store.upsert_rate(FxRate::new(base, quote, as_of, rate))?;
        debug!(%base, %quote, %as_of, %rate, "fx rate registered");
        Ok(snapshot)
    }

    /// Rate converting `quote` amounts into `base` at exactly `as_of`.
    ///
    /// # Errors
    ///
    /// Returns [`FxError::Missing`] when no snapshot has that exact key.
    pub fn get_rate(
        &self,
        base: CurrencyCode,
        quote: CurrencyCode,
        as_of: DateTime<Utc>,
    ) -> Result<Decimal, FxError> {
        if base == quote {
            return Ok(Decimal::ONE);
        }
        self.store
            .get_rate(base, quote, as_of)
            .map(|snapshot| snapshot.rate)
            .ok_or(FxError::Missing { base, quote, as_of })
    }

    /// Converts a `quote` amount into `base`, rounded like booked amounts.
    ///
    /// # Errors
    ///
    /// Returns [`FxError::Missing`] when no snapshot has that exact key and
    /// [`FxError::Overflow`] when the converted amount does not fit.
    pub fn convert(
        &self,
        amount: Decimal,
        base: CurrencyCode,
        quote: CurrencyCode,
        as_of: DateTime<Utc>,
    ) -> Result<Decimal, FxError> {
        let rate = self.get_rate(base, quote, as_of)?;
        convert_booked(amount, rate).ok_or(FxError::Overflow { amount, rate })
    }

    /// All snapshots registered for a pair, oldest first.
    #[must_use]
    pub fn history(&self, base: CurrencyCode, quote: CurrencyCode) -> Vec<FxRate> {
        self.store.list_rates(base, quote)
    }
}
