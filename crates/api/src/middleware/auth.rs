//! Authentication extractors.
//!
//! Requests authenticate with `Authorization: Bearer <jwt>`. The token is
//! verified, its subject is loaded from the database and the resulting
//! [`User`] is cached in the request extensions so several extractors on the
//! same handler only hit the database once.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireAuth(user): RequireAuth) -> ApiResponse<User> {
///     response::ok(user)
/// }
/// ```
pub struct RequireAuth(pub User);

/// Extractor that resolves the user when a valid token is present.
///
/// A missing, malformed or expired token yields `None`; the request is
/// served as a guest.
pub struct OptionalAuth(pub Option<User>);

/// Extractor that requires a staff or superuser account.
pub struct RequireStaff(pub User);

/// Extractor that requires a superuser account.
pub struct RequireSuperuser(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match authenticate(parts, state).await {
            Ok(user) => Ok(Self(Some(user))),
            // Database trouble is not the caller's fault; don't mask it as a guest
            Err(AppError::Auth(AuthError::Repository(e))) => Err(AppError::Database(e)),
            Err(_) => Ok(Self(None)),
        }
    }
}

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireSuperuser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        if !user.is_superuser {
            return Err(AppError::Forbidden("Superuser access required".to_string()));
        }
        Ok(Self(user))
    }
}

async fn authenticate(parts: &mut Parts, state: &AppState) -> Result<User, AppError> {
    if let Some(user) = parts.extensions.get::<User>() {
        return Ok(user.clone());
    }

    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                if rejection.is_missing() {
                    AppError::Unauthorized("Authentication required".to_string())
                } else {
                    AppError::Auth(AuthError::InvalidToken)
                }
            })?;

    let claims = state.tokens().verify(bearer.token())?;
    let user = AuthService::new(state.pool()).user_for_claims(&claims).await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::Span::current().record("user_id", user.id.as_i32());

    parts.extensions.insert(user.clone());
    Ok(user)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header::AUTHORIZATION},
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_state;

    async fn optional(OptionalAuth(user): OptionalAuth) -> &'static str {
        if user.is_some() { "user" } else { "guest" }
    }

    async fn required(RequireAuth(_): RequireAuth) -> &'static str {
        "user"
    }

    async fn staff(RequireStaff(_): RequireStaff) -> &'static str {
        "staff"
    }

    fn app() -> Router {
        Router::new()
            .route("/optional", get(optional))
            .route("/required", get(required))
            .route("/staff", get(staff))
            .with_state(test_state())
    }

    async fn fetch_status(uri: &str, authorization: Option<&str>) -> (StatusCode, String) {
        let mut request = Request::builder().uri(uri);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let response = app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (status, body) = fetch_status("/required", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Authentication required"));

        let (status, _) = fetch_status("/staff", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let (status, body) = fetch_status("/required", Some("Bearer not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("\"success\":false"));

        let (status, _) = fetch_status("/required", Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_optional_auth_falls_back_to_guest() {
        let (status, body) = fetch_status("/optional", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "guest");

        let (status, body) = fetch_status("/optional", Some("Bearer not.a.jwt")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "guest");
    }
}
