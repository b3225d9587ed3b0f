//! Pricing rules: coupons, offers and order totals.
//!
//! Everything here is pure arithmetic over [`Decimal`](rust_decimal::Decimal)
//! amounts. The API crate loads coupons and offers from the database, converts
//! them into the `*Terms` types below and lets this module decide the numbers.
//!
//! # Order of application
//!
//! 1. Offers lower each product's unit price ([`best_offer`]).
//! 2. The subtotal is the sum of discounted line totals.
//! 3. A coupon discounts the subtotal or waives shipping ([`CouponTerms::apply`]).
//! 4. Shipping and tax are added ([`OrderTotals::compute`]).

mod coupon;
mod offer;
mod totals;

pub use coupon::{CouponDiscount, CouponRejection, CouponTerms};
pub use offer::{OfferTerms, best_offer};
pub use totals::{LineAmount, OrderTotals, PricingRules};
