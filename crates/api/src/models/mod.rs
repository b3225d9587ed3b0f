//! Domain models for the Shopfront API.
//!
//! Row types derive `sqlx::FromRow` and are serialized directly into JSON
//! responses. Request payloads live next to the model they create or update.

pub mod cart;
pub mod category;
pub mod coupon;
pub mod offer;
pub mod order;
pub mod pagination;
pub mod product;
pub mod user;
pub mod wishlist;

pub use cart::{CartItem, CartLine, CartOwner, CartView};
pub use category::{Category, CategoryInput, CategoryNode, CategoryUpdate};
pub use coupon::{Coupon, CouponInput, CouponUpdate};
pub use offer::{Offer, OfferInput, OfferUpdate};
pub use order::{Order, OrderDetail, OrderItem, ShippingAddress};
pub use pagination::{Page, PageParams};
pub use product::{Product, ProductFilter, ProductInput, ProductSort, ProductUpdate, ProductView};
pub use user::{User, UserFlagsUpdate, UserProfileUpdate};
pub use wishlist::WishlistEntry;
