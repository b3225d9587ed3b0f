//! Business logic services.
//!
//! Services borrow the pool (and the catalog cache or Stripe client where
//! needed) for the duration of a request and return typed errors that
//! [`crate::error::AppError`] maps to HTTP responses.
//!
//! # Services
//!
//! - `auth` - Registration, login, JWT issue/verify, profile
//! - `catalog` - Categories, products and offer pricing (cached)
//! - `cart` - User and guest carts
//! - `orders` - Checkout, order history, cancellation, admin status changes
//! - `coupons` - Coupon validation and admin CRUD
//! - `offers` - Live promotions and admin CRUD
//! - `wishlist` - Saved products
//! - `users` - Admin account management
//! - `payments` - Stripe payment intents
//! - `uploads` - Image validation and storage

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod offers;
pub mod orders;
pub mod payments;
pub mod uploads;
pub mod users;
pub mod wishlist;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use catalog::{CatalogCache, CatalogError, CatalogService};
pub use coupons::{CouponError, CouponService};
pub use offers::OfferService;
pub use orders::{OrderError, OrderService};
pub use payments::{PaymentError, PaymentService};
pub use uploads::UploadError;
pub use users::{UserAdminError, UserAdminService};
pub use wishlist::WishlistService;
