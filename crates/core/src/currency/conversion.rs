//! Currency conversion logic.
//!
//! CRITICAL: Rounding strategy for multi-currency:
//! - Booked amounts carry 4 decimal places
//! - Use banker's rounding (round half to even)
//! - Store both native and booked amounts plus the rate applied

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Decimal places kept on converted (booked) amounts.
pub const BOOKED_DECIMAL_PLACES: u32 = 4;

/// Converts an amount using the given exchange rate.
///
/// Uses banker's rounding (round half to even) to minimize cumulative errors.
/// Returns `None` when the product does not fit in a `Decimal`.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Option<Decimal> {
    amount.checked_mul(rate).map(|converted| {
        converted.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
    })
}

/// Converts into the booking currency at [`BOOKED_DECIMAL_PLACES`].
///
/// ```
/// use rust_decimal_macros::dec;
/// use tally_core::currency::conversion::convert_booked;
///
/// assert_eq!(convert_booked(dec!(100), dec!(18.5)), Some(dec!(1850.0000)));
/// ```
#[must_use]
pub fn convert_booked(amount: Decimal, rate: Decimal) -> Option<Decimal> {
    convert_amount(amount, rate, BOOKED_DECIMAL_PLACES)
}
