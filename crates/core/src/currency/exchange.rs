//! Exchange rate snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::CurrencyCode;

/// A rate snapshot keyed by (base, quote, exact instant).
///
/// `rate` is the number of `base` units per one `quote` unit, so an amount held
/// in `quote` is expressed in `base` as `amount * rate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxRate {
    /// Currency amounts are converted into.
    pub base: CurrencyCode,
    /// Currency amounts are converted from.
    pub quote: CurrencyCode,
    /// Instant the snapshot applies to. Lookups must match it exactly.
    pub as_of: DateTime<Utc>,
    /// Base units per quote unit. Always positive.
    pub rate: Decimal,
}

impl FxRate {
    /// Creates a snapshot.
    #[must_use]
    pub const fn new(
        base: CurrencyCode,
        quote: CurrencyCode,
        as_of: DateTime<Utc>,
        rate: Decimal,
    ) -> Self {
        Self {
            base,
            quote,
            as_of,
            rate,
        }
    }
}
