//! Money helpers using decimal arithmetic.
//!
//! Amounts are `rust_decimal::Decimal` in the currency's standard unit
//! (dollars, not cents) and are stored as `NUMERIC(10,2)`.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round an amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert an amount to minor units (cents) for payment processors.
///
/// Returns `None` if the amount is negative or does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    if amount.is_sign_negative() {
        return None;
    }
    let cents = round_money(amount) * Decimal::ONE_HUNDRED;
    i64::try_from(cents.trunc()).ok()
}

/// Format an amount with two decimal places (e.g. `"50.00"`).
#[must_use]
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap_or_default()
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec("10.005")), dec("10.01"));
        assert_eq!(round_money(dec("10.004")), dec("10.00"));
        assert_eq!(round_money(dec("-1.005")), dec("-1.01"));
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(dec("19.99")), Some(1999));
        assert_eq!(to_minor_units(dec("0")), Some(0));
        assert_eq!(to_minor_units(dec("12.345")), Some(1235));
        assert_eq!(to_minor_units(dec("-1")), None);
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec("50")), "50.00");
        assert_eq!(format_money(dec("3.5")), "3.50");
    }
}
