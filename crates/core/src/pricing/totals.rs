//! Order total calculation.

use rust_decimal::Decimal;
use serde::Serialize;

use super::CouponDiscount;
use crate::types::round_money;

/// Store-wide shipping and tax settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingRules {
    /// Flat shipping charge for a non-empty order.
    pub shipping_flat_rate: Decimal,
    /// Discounted subtotal at or above which shipping is free.
    pub free_shipping_threshold: Option<Decimal>,
    /// Tax as a fraction (0.08 = 8%) of the discounted subtotal.
    pub tax_rate: Decimal,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            shipping_flat_rate: Decimal::new(599, 2),
            free_shipping_threshold: Some(Decimal::new(50, 0)),
            tax_rate: Decimal::ZERO,
        }
    }
}

/// A priced order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineAmount {
    /// Unit price times quantity, rounded to cents.
    #[must_use]
    pub fn total(&self) -> Decimal {
        round_money(self.unit_price * Decimal::from(self.quantity))
    }
}

/// Money breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute totals for `lines` with an optional coupon discount.
    #[must_use]
    pub fn compute(
        lines: &[LineAmount],
        coupon: Option<&CouponDiscount>,
        rules: &PricingRules,
    ) -> Self {
        let subtotal = round_money(lines.iter().map(LineAmount::total).sum());

        let discount = coupon
            .map_or(Decimal::ZERO, |c| c.amount)
            .clamp(Decimal::ZERO, subtotal);
        let discounted = subtotal - discount;

        let waived = coupon.is_some_and(|c| c.free_shipping)
            || rules
                .free_shipping_threshold
                .is_some_and(|threshold| discounted >= threshold);
        let shipping = if lines.is_empty() || waived {
            Decimal::ZERO
        } else {
            round_money(rules.shipping_flat_rate.max(Decimal::ZERO))
        };

        let tax = round_money(discounted * rules.tax_rate.max(Decimal::ZERO));
        let total = round_money(discounted + shipping + tax);

        Self {
            subtotal,
            discount,
            shipping,
            tax,
            total,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(price: &str, quantity: u32) -> LineAmount {
        LineAmount {
            unit_price: dec(price),
            quantity,
        }
    }

    #[test]
    fn test_flat_shipping_below_threshold() {
        let totals = OrderTotals::compute(&[line("10.00", 2)], None, &PricingRules::default());
        assert_eq!(totals.subtotal, dec("20.00"));
        assert_eq!(totals.shipping, dec("5.99"));
        assert_eq!(totals.total, dec("25.99"));
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let totals = OrderTotals::compute(&[line("25.00", 2)], None, &PricingRules::default());
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, dec("50.00"));
    }

    #[test]
    fn test_threshold_uses_discounted_subtotal() {
        let coupon = CouponDiscount {
            amount: dec("5.00"),
            free_shipping: false,
        };
        let totals =
            OrderTotals::compute(&[line("25.00", 2)], Some(&coupon), &PricingRules::default());
        assert_eq!(totals.discount, dec("5.00"));
        assert_eq!(totals.shipping, dec("5.99"));
        assert_eq!(totals.total, dec("50.99"));
    }

    #[test]
    fn test_free_shipping_coupon() {
        let coupon = CouponDiscount {
            amount: Decimal::ZERO,
            free_shipping: true,
        };
        let totals = OrderTotals::compute(&[line("5.00", 1)], Some(&coupon), &PricingRules::default());
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, dec("5.00"));
    }

    #[test]
    fn test_tax_applies_after_discount() {
        let rules = PricingRules {
            shipping_flat_rate: Decimal::ZERO,
            free_shipping_threshold: None,
            tax_rate: dec("0.08"),
        };
        let coupon = CouponDiscount {
            amount: dec("10.00"),
            free_shipping: false,
        };
        let totals = OrderTotals::compute(&[line("33.33", 3)], Some(&coupon), &rules);
        assert_eq!(totals.subtotal, dec("99.99"));
        // (99.99 - 10.00) * 0.08 = 7.1992
        assert_eq!(totals.tax, dec("7.20"));
        assert_eq!(totals.total, dec("97.19"));
    }

    #[test]
    fn test_discount_is_clamped_to_subtotal() {
        let coupon = CouponDiscount {
            amount: dec("100"),
            free_shipping: false,
        };
        let totals = OrderTotals::compute(&[line("10", 1)], Some(&coupon), &PricingRules::default());
        assert_eq!(totals.discount, dec("10"));
        assert_eq!(totals.total, dec("5.99"));
    }

    #[test]
    fn test_empty_order_has_no_shipping() {
        let totals = OrderTotals::compute(&[], None, &PricingRules::default());
        assert_eq!(totals, OrderTotals::default());
    }
}
