//! Promotional offers on products and categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::{DiscountType, round_money};

/// The parts of an offer that decide whether and how much it discounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferTerms {
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
}

impl OfferTerms {
    /// Whether the offer applies at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|starts| starts <= now)
            && self.ends_at.is_none_or(|ends| now < ends)
            && self.usage_limit.is_none_or(|limit| self.used_count < limit)
    }

    /// Per-unit discount on `unit_price`, between zero and the price itself.
    #[must_use]
    pub fn discount_for(&self, unit_price: Decimal) -> Decimal {
        let unit_price = unit_price.max(Decimal::ZERO);
        let raw = match self.discount_type {
            DiscountType::Percentage => unit_price * self.discount_value / Decimal::ONE_HUNDRED,
            DiscountType::Fixed => self.discount_value,
        };
        round_money(raw.clamp(Decimal::ZERO, unit_price))
    }
}

/// Pick the offer giving the largest discount on `unit_price` at `now`.
///
/// Returns the index of the winning offer within `offers` and the discounted
/// unit price, or `None` if no offer is live. Ties keep the earliest offer.
#[must_use]
pub fn best_offer<'a, I>(unit_price: Decimal, offers: I, now: DateTime<Utc>) -> Option<(usize, Decimal)>
where
    I: IntoIterator<Item = &'a OfferTerms>,
{
    let mut best: Option<(usize, Decimal)> = None;

    for (idx, offer) in offers.into_iter().enumerate() {
        if !offer.is_live(now) {
            continue;
        }
        let discount = offer.discount_for(unit_price);
        if best.is_none_or(|(_, current)| discount > current) {
            best = Some((idx, discount));
        }
    }

    best.map(|(idx, discount)| (idx, round_money(unit_price - discount)))
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

    fn offer(discount_type: DiscountType, value: &str) -> OfferTerms {
        OfferTerms {
            discount_type,
            discount_value: dec(value),
            is_active: true,
            starts_at: None,
            ends_at: None,
            usage_limit: None,
            used_count: 0,
        }
    }

    #[test]
    fn test_discount_for() {
        assert_eq!(
            offer(DiscountType::Percentage, "20").discount_for(dec("25.00")),
            dec("5.00")
        );
        assert_eq!(
            offer(DiscountType::Fixed, "30").discount_for(dec("25.00")),
            dec("25.00")
        );
    }

    #[test]
    fn test_best_offer_picks_largest_discount() {
        let offers = [
            offer(DiscountType::Percentage, "10"),
            offer(DiscountType::Fixed, "4"),
            offer(DiscountType::Percentage, "15"),
        ];
        let (idx, price) = best_offer(dec("20.00"), &offers, Utc::now()).unwrap();
        // 10% = 2.00, fixed = 4.00, 15% = 3.00
        assert_eq!(idx, 1);
        assert_eq!(price, dec("16.00"));
    }

    #[test]
    fn test_best_offer_skips_offers_that_are_not_live() {
        let now = Utc::now();
        let offers = [
            OfferTerms {
                ends_at: Some(now - Duration::hours(1)),
                ..offer(DiscountType::Fixed, "10")
            },
            OfferTerms {
                usage_limit: Some(1),
                used_count: 1,
                ..offer(DiscountType::Fixed, "9")
            },
            OfferTerms {
                starts_at: Some(now + Duration::hours(1)),
                ..offer(DiscountType::Fixed, "8")
            },
            offer(DiscountType::Fixed, "1"),
        ];
        let (idx, price) = best_offer(dec("20.00"), &offers, now).unwrap();
        assert_eq!(idx, 3);
        assert_eq!(price, dec("19.00"));
    }

    #[test]
    fn test_best_offer_none() {
        let offers: [OfferTerms; 0] = [];
        assert!(best_offer(dec("10"), &offers, Utc::now()).is_none());

        let inactive = [OfferTerms {
            is_active: false,
            ..offer(DiscountType::Fixed, "1")
        }];
        assert!(best_offer(dec("10"), &inactive, Utc::now()).is_none());
    }
}
