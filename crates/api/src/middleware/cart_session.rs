//! Cart owner resolution.
//!
//! A signed-in user owns their cart directly. Guests are identified by a
//! session ID sent in the `X-Session-ID` header or the `cart_session`
//! cookie; when neither is present a fresh UUID is issued. Guest responses
//! echo the session back in both places so the client can keep using it.

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, header::SET_COOKIE, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use super::auth::OptionalAuth;
use crate::error::AppError;
use crate::models::{CartOwner, User};
use crate::state::AppState;

/// Header carrying the guest cart session.
pub const SESSION_HEADER: &str = "x-session-id";

/// Cookie carrying the guest cart session.
pub const SESSION_COOKIE: &str = "cart_session";

const SESSION_COOKIE_MAX_AGE_DAYS: i64 = 30;
const MAX_SESSION_ID_LEN: usize = 128;

/// Who the cart in this request belongs to.
pub struct CartContext {
    pub owner: CartOwner,
    /// The authenticated user, if any.
    pub user: Option<User>,
    /// Guest session sent by the client, or issued for a new guest.
    pub guest_session: Option<String>,
    secure: bool,
}

impl FromRequestParts<AppState> for CartContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let OptionalAuth(user) = OptionalAuth::from_request_parts(parts, state).await?;
        let jar = CookieJar::from_headers(&parts.headers);

        let sent = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| is_valid_session_id(id))
            .map(String::from)
            .or_else(|| {
                jar.get(SESSION_COOKIE)
                    .map(Cookie::value)
                    .filter(|id| is_valid_session_id(id))
                    .map(String::from)
            });

        let (owner, guest_session) = match &user {
            Some(user) => (CartOwner::User(user.id), sent),
            None => {
                let session = sent.unwrap_or_else(|| Uuid::new_v4().to_string());
                (CartOwner::Guest(session.clone()), Some(session))
            }
        };

        Ok(Self {
            owner,
            user,
            guest_session,
            secure: state.config().is_secure(),
        })
    }
}

impl CartContext {
    /// The guest session ID when the cart is owned by a guest.
    #[must_use]
    pub fn guest_id(&self) -> Option<&str> {
        match &self.owner {
            CartOwner::Guest(session) => Some(session),
            CartOwner::User(_) => None,
        }
    }

    /// Attach the guest session header and cookie to a response.
    pub fn respond(&self, body: impl IntoResponse) -> Response {
        let mut response = body.into_response();
        let Some(session) = self.guest_id() else {
            return response;
        };

        let cookie = session_cookie(session.to_string(), self.secure);
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(session) {
            headers.insert(SESSION_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            headers.append(SET_COOKIE, value);
        }
        response
    }
}

fn session_cookie(session: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(SESSION_COOKIE_MAX_AGE_DAYS))
        .secure(secure)
        .build()
}

fn is_valid_session_id(id: &str) -> bool {
    (8..=MAX_SESSION_ID_LEN).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header::COOKIE},
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_state;

    async fn whoami(cart: CartContext) -> Response {
        let body = cart.guest_id().unwrap_or("user").to_string();
        cart.respond(body)
    }

    async fn call(request: Request<Body>) -> Response {
        Router::new()
            .route("/cart", get(whoami))
            .with_state(test_state())
            .oneshot(request)
            .await
            .unwrap()
    }

    #[test]
    fn test_is_valid_session_id() {
        assert!(is_valid_session_id("3f2c9a1e-8d4b-4a57-9c1e-0b6f1d2e3a4b"));
        assert!(is_valid_session_id("abc_DEF-123"));
        assert!(!is_valid_session_id("short"));
        assert!(!is_valid_session_id("has spaces in it"));
        assert!(!is_valid_session_id("semi;colon=cookie"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abcdef123456".to_string(), true).to_string();
        assert!(cookie.starts_with("cart_session=abcdef123456"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=2592000"));
    }

    #[tokio::test]
    async fn test_new_guest_gets_a_session() {
        let response = call(Request::builder().uri("/cart").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let session = response.headers()[SESSION_HEADER].to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&session).is_ok());
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with(&format!("cart_session={session}")));
    }

    #[tokio::test]
    async fn test_header_wins_over_cookie() {
        let response = call(
            Request::builder()
                .uri("/cart")
                .header(SESSION_HEADER, "header-session-1")
                .header(COOKIE, "cart_session=cookie-session-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.headers()[SESSION_HEADER], "header-session-1");

        let response = call(
            Request::builder()
                .uri("/cart")
                .header(COOKIE, "cart_session=cookie-session-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.headers()[SESSION_HEADER], "cookie-session-1");
    }
}
