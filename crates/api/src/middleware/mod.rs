//! HTTP middleware and request extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (`x-request-id`)
//! 4. Security headers
//! 5. CORS
//! 6. Rate limiting on `/api/auth` (governor)
//!
//! Authentication and cart ownership are extractors rather than layers so
//! each handler states what it needs.

pub mod auth;
pub mod cart_session;
pub mod cors;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{OptionalAuth, RequireAuth, RequireStaff, RequireSuperuser};
pub use cart_session::CartContext;
pub use cors::cors_layer;
pub use rate_limit::{auth_rate_limiter, rate_limit_envelope};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
