//! Rounding rules for gallons, dollars, and rates.
//!
//! CRITICAL: Never use floating-point for gallons or tax amounts.
//! Every quantity is a `rust_decimal::Decimal` and is rounded with
//! banker's rounding (round half to even) at the documented scale.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for wine gallons and proof gallons.
pub const GALLON_DECIMAL_PLACES: u32 = 2;

/// Decimal places kept for dollar amounts.
pub const CURRENCY_DECIMAL_PLACES: u32 = 2;

/// Decimal places kept for derived per-gallon rates.
pub const RATE_DECIMAL_PLACES: u32 = 4;

/// Rounds a gallon quantity to two decimals.
#[must_use]
pub fn round_gallons(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(GALLON_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven)
}

/// Rounds a dollar amount to cents.
#[must_use]
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven)
}

/// Rounds a derived rate (dollars per proof gallon) to four decimals.
#[must_use]
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven)
}
