//! Money helpers.
//!
//! Prices and order amounts are `rust_decimal::Decimal` in the currency's
//! standard unit (e.g. euros). The payment gateway speaks minor units
//! (cents), so conversion lives here, next to the types that need it.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Convert an amount in standard units to minor units (cents).
///
/// Rounds half-up to two decimal places first, so `19.999` becomes `2000`
/// cents. Returns `None` if the amount does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    let cents = amount.round_dp(2).checked_mul(Decimal::ONE_HUNDRED)?;
    cents.to_i64()
}
