//! Coupon validation and discount calculation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{CouponType, round_money};

/// Reasons a coupon cannot be applied.
///
/// The messages are shown to shoppers as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponRejection {
    #[error("Coupon is not active")]
    Inactive,
    #[error("Coupon is not valid yet")]
    NotStarted,
    #[error("Coupon has expired")]
    Expired,
    #[error("Coupon usage limit has been reached")]
    UsageLimitReached,
    #[error("Minimum order amount of {minimum:.2} required")]
    MinimumNotMet {
        /// The coupon's minimum order subtotal.
        minimum: Decimal,
    },
}

/// The parts of a coupon that decide whether and how much it discounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponTerms {
    pub discount_type: CouponType,
    /// Percent (0-100] for percentage coupons, an amount for fixed ones.
    /// Ignored for free-shipping coupons.
    pub discount_value: Decimal,
    pub min_order_amount: Option<Decimal>,
    /// Upper bound for percentage discounts.
    pub max_discount_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of applying a coupon to a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CouponDiscount {
    /// Amount taken off the subtotal, never more than the subtotal.
    pub amount: Decimal,
    /// Whether the shipping charge is waived.
    pub free_shipping: bool,
}

impl CouponTerms {
    /// Check the coupon is switched on, inside its validity window and under
    /// its usage limit at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponRejection`] that applies.
    pub fn check_availability(&self, now: DateTime<Utc>) -> Result<(), CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }
        if self.starts_at.is_some_and(|starts| now < starts) {
            return Err(CouponRejection::NotStarted);
        }
        if self.expires_at.is_some_and(|expires| now >= expires) {
            return Err(CouponRejection::Expired);
        }
        if self
            .usage_limit
            .is_some_and(|limit| self.used_count >= limit)
        {
            return Err(CouponRejection::UsageLimitReached);
        }
        Ok(())
    }

    /// Calculate the discount this coupon gives on `subtotal`.
    ///
    /// # Errors
    ///
    /// Returns [`CouponRejection::MinimumNotMet`] when the subtotal is below the
    /// coupon's minimum order amount.
    pub fn calculate_discount(&self, subtotal: Decimal) -> Result<CouponDiscount, CouponRejection> {
        if let Some(minimum) = self.min_order_amount
            && subtotal < minimum
        {
            return Err(CouponRejection::MinimumNotMet { minimum });
        }

        let subtotal = subtotal.max(Decimal::ZERO);

        let discount = match self.discount_type {
            CouponType::Percentage => {
                let raw = subtotal * self.discount_value / Decimal::ONE_HUNDRED;
                let capped = self
                    .max_discount_amount
                    .map_or(raw, |cap| raw.min(cap));
                CouponDiscount {
                    amount: capped,
                    free_shipping: false,
                }
            }
            CouponType::Fixed => CouponDiscount {
                amount: self.discount_value,
                free_shipping: false,
            },
            CouponType::FreeShipping => CouponDiscount {
                amount: Decimal::ZERO,
                free_shipping: true,
            },
        };

        Ok(CouponDiscount {
            amount: round_money(discount.amount.clamp(Decimal::ZERO, subtotal)),
            ..discount
        })
    }

    /// Availability check followed by discount calculation.
    ///
    /// # Errors
    ///
    /// Returns the first [`CouponRejection`] that applies.
    pub fn apply(
        &self,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<CouponDiscount, CouponRejection> {
        self.check_availability(now)?;
        self.calculate_discount(subtotal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::Duration;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn terms(discount_type: CouponType, value: &str) -> CouponTerms {
        CouponTerms {
            discount_type,
            discount_value: dec(value),
            min_order_amount: None,
            max_discount_amount: None,
            usage_limit: None,
            used_count: 0,
            is_active: true,
            starts_at: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let coupon = terms(CouponType::Percentage, "10");
        let discount = coupon.calculate_discount(dec("80.00")).unwrap();
        assert_eq!(discount.amount, dec("8.00"));
        assert!(!discount.free_shipping);
    }

    #[test]
    fn test_percentage_discount_is_capped() {
        let coupon = CouponTerms {
            max_discount_amount: Some(dec("15")),
            ..terms(CouponType::Percentage, "50")
        };
        let discount = coupon.calculate_discount(dec("100")).unwrap();
        assert_eq!(discount.amount, dec("15"));
    }

    #[test]
    fn test_percentage_discount_rounds_to_cents() {
        let coupon = terms(CouponType::Percentage, "15");
        let discount = coupon.calculate_discount(dec("19.99")).unwrap();
        // 2.9985 -> 3.00
        assert_eq!(discount.amount, dec("3.00"));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_subtotal() {
        let coupon = terms(CouponType::Fixed, "25");
        assert_eq!(coupon.calculate_discount(dec("40")).unwrap().amount, dec("25"));
        assert_eq!(coupon.calculate_discount(dec("10")).unwrap().amount, dec("10"));
    }

    #[test]
    fn test_free_shipping() {
        let coupon = terms(CouponType::FreeShipping, "0");
        let discount = coupon.calculate_discount(dec("30")).unwrap();
        assert_eq!(discount.amount, Decimal::ZERO);
        assert!(discount.free_shipping);
    }

    #[test]
    fn test_minimum_order_amount() {
        let coupon = CouponTerms {
            min_order_amount: Some(dec("50")),
            ..terms(CouponType::Fixed, "5")
        };

        let err = coupon.calculate_discount(dec("49.99")).unwrap_err();
        assert_eq!(err, CouponRejection::MinimumNotMet { minimum: dec("50") });
        assert_eq!(err.to_string(), "Minimum order amount of 50.00 required");

        assert!(coupon.calculate_discount(dec("50")).is_ok());
    }

    #[test]
    fn test_availability() {
        let now = Utc::now();
        let base = terms(CouponType::Fixed, "5");

        assert_eq!(base.check_availability(now), Ok(()));

        let inactive = CouponTerms {
            is_active: false,
            ..base.clone()
        };
        assert_eq!(inactive.check_availability(now), Err(CouponRejection::Inactive));

        let future = CouponTerms {
            starts_at: Some(now + Duration::days(1)),
            ..base.clone()
        };
        assert_eq!(future.check_availability(now), Err(CouponRejection::NotStarted));

        let expired = CouponTerms {
            expires_at: Some(now - Duration::seconds(1)),
            ..base.clone()
        };
        assert_eq!(expired.check_availability(now), Err(CouponRejection::Expired));

        let used_up = CouponTerms {
            usage_limit: Some(3),
            used_count: 3,
            ..base
        };
        assert_eq!(
            used_up.check_availability(now),
            Err(CouponRejection::UsageLimitReached)
        );
    }

    #[test]
    fn test_apply_checks_availability_first() {
        let coupon = CouponTerms {
            is_active: false,
            min_order_amount: Some(dec("100")),
            ..terms(CouponType::Fixed, "5")
        };
        assert_eq!(
            coupon.apply(dec("10"), Utc::now()),
            Err(CouponRejection::Inactive)
        );
    }
}
