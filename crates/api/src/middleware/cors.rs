//! CORS policy from configuration.

use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use super::cart_session::SESSION_HEADER;
use crate::config::CorsOrigins;

/// Build the CORS layer for the configured origins.
///
/// Invalid origins are skipped with a warning.
#[must_use]
pub fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(SESSION_HEADER),
        ])
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    match origins {
        CorsOrigins::None => base,
        CorsOrigins::Any => base.allow_origin(Any),
        CorsOrigins::List(list) => {
            let parsed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| {
                    HeaderValue::from_str(origin)
                        .inspect_err(|_| warn!(%origin, "Ignoring invalid CORS origin"))
                        .ok()
                })
                .collect();
            base.allow_origin(AllowOrigin::list(parsed))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    use super::*;

    async fn preflight(origins: &CorsOrigins, origin: &str) -> Option<HeaderValue> {
        let app = Router::new()
            .route("/api/products", get(|| async { "ok" }))
            .layer(cors_layer(origins));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/products")
                    .header(header::ORIGIN, origin)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .cloned()
    }

    #[tokio::test]
    async fn test_listed_origin_is_allowed() {
        let origins = CorsOrigins::List(vec!["https://shop.example.com".to_string()]);
        assert_eq!(
            preflight(&origins, "https://shop.example.com").await.unwrap(),
            "https://shop.example.com"
        );
        assert!(preflight(&origins, "https://evil.example.net").await.is_none());
    }

    #[tokio::test]
    async fn test_any_and_none() {
        assert_eq!(
            preflight(&CorsOrigins::Any, "https://a.example").await.unwrap(),
            "*"
        );
        assert!(preflight(&CorsOrigins::None, "https://a.example").await.is_none());
    }
}
