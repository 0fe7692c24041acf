//! Common arithmetic shared by tax derivation and reporting.

use rust_decimal::{Decimal, RoundingStrategy};

/// Average charge per person per night: `amount / persons / nights`.
///
/// Uses plain decimal division with no intermediate rounding. Returns zero
/// when either divisor is zero or negative.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use lodging_tax_core::calculations::common::rate_per_person_per_night;
///
/// assert_eq!(rate_per_person_per_night(dec!(300000), 2, 3), dec!(50000));
/// assert_eq!(rate_per_person_per_night(dec!(300000), 0, 3), dec!(0));
/// ```
pub fn rate_per_person_per_night(
    amount: Decimal,
    persons: i32,
    nights: i32,
) -> Decimal {
    if persons <= 0 || nights <= 0 {
        return Decimal::ZERO;
    }
    amount / Decimal::from(persons) / Decimal::from(nights)
}

/// Drops the fractional part of a rate before bracket matching.
///
/// Fractions are discarded rather than rounded, so `19999.99` becomes `19999`.
pub fn truncate_to_whole_units(value: Decimal) -> Decimal {
    value.trunc()
}

/// Rounds to whole currency units for display, half to even.
pub fn round_to_whole_units(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
}
