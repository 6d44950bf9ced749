//! Property-based tests for currency operations.
//!
//! - Banker's rounding correctness of booked conversion
//! - Exact-instant behavior of the rate table

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::CurrencyCode;

use super::conversion::{convert_amount, convert_booked, BOOKED_DECIMAL_PLACES};
use super::error::FxError;
use super::fx::FxRateTable;
use crate::store::InMemoryStore;

/// Strategy to generate signed amounts (-1,000,000.00 to 1,000,000.00, nonzero).
fn signed_amount() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2)),
        (1i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2)),
    ]
}

/// Strategy to generate positive exchange rates (0.0001 to 10000.0000).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Booked conversion never carries more than 4 decimal places.
    #[test]
    fn prop_convert_rounds_to_4_decimals(
        amount in signed_amount(),
        rate in positive_rate(),
    ) {
        let result = convert_booked(amount, rate).unwrap();
        prop_assert!(result.scale() <= BOOKED_DECIMAL_PLACES, "{} has scale {}", result, result.scale());
    }

    /// Conversion with a positive rate preserves the sign.
    #[test]
    fn prop_convert_preserves_sign(
        amount in signed_amount(),
        rate in (1i64..100_000i64).prop_map(|v| Decimal::new(v, 2)),
    ) {
        let result = convert_booked(amount, rate).unwrap();
        prop_assert_eq!(result.is_sign_negative(), amount.is_sign_negative());
        prop_assert!(!result.is_zero());
    }

    /// Rate 1 leaves amounts with at most 4 decimals unchanged.
    #[test]
    fn prop_unit_rate_is_identity(amount in signed_amount()) {
        prop_assert_eq!(convert_amount(amount, Decimal::ONE, BOOKED_DECIMAL_PLACES), Some(amount));
    }

    /// A snapshot is found at its own instant and nowhere else.
    #[test]
    fn prop_rate_lookup_is_exact(
        rate in positive_rate(),
        offset_secs in 1i64..86_400i64,
    ) {
        let store = InMemoryStore::new();
        let fx = FxRateTable::new(&store);
        let mxn = CurrencyCode::parse("MXN").unwrap();
        let usd = CurrencyCode::parse("USD").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        fx.ensure(mxn, usd, at, rate).unwrap();

        prop_assert_eq!(fx.get_rate(mxn, usd, at).unwrap(), rate);
        let missing = fx.get_rate(mxn, usd, at + Duration::seconds(offset_secs));
        prop_assert!(matches!(missing, Err(FxError::Missing { .. })), "expected FxError::Missing, got {:?}", missing);
    }
}
