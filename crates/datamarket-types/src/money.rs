//! Fixed-point money helpers.
//!
//! Every derived monetary amount is rounded to two decimal places, half
//! away from zero, immediately after it is computed.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on every monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Round to two decimal places, half away from zero.
#[must_use]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `price / hours` rounded to cents; zero when `hours` is zero.
#[must_use]
pub fn rate_per_hour(price: Decimal, hours: Decimal) -> Decimal {
    if hours.is_zero() {
        return Decimal::ZERO;
    }
    price
        .checked_div(hours)
        .map_or(Decimal::ZERO, round2)
}
