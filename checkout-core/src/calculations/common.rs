//! Common money helpers shared by the financing and charges calculations.
//!
//! All amounts are [`Decimal`]; rounding is always half away from zero, which
//! for the non-negative values used here matches the usual "round half up".

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use checkout_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds to the nearest whole currency unit (half up).
///
/// Monthly installments are quoted in whole euros.
///
/// ```
/// use rust_decimal_macros::dec;
/// use checkout_core::calculations::common::round_to_unit;
///
/// assert_eq!(round_to_unit(dec!(430.93)), dec!(431));
/// assert_eq!(round_to_unit(dec!(430.5)), dec!(431));
/// assert_eq!(round_to_unit(dec!(430.49)), dec!(430));
/// ```
pub fn round_to_unit(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount * percent / 100`, unrounded.
pub fn percent_of(
    amount: Decimal,
    percent: Decimal,
) -> Decimal {
    amount * percent / Decimal::ONE_HUNDRED
}
