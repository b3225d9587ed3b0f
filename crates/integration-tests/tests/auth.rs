//! Registration and access-control tests.
//!
//! Run with: `cargo test -p shopfront-integration-tests --test auth -- --ignored`

use reqwest::{Method, StatusCode};
use serde_json::json;

use shopfront_integration_tests::{TEST_PASSWORD, TestContext, admin_token};

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server with database"]
async fn test_duplicate_registration_conflicts() {
    let ctx = TestContext::new();
    let user = ctx.register().await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": user.email.to_uppercase(), "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(
        body["error"].as_str().unwrap().contains("already exists"),
        "unexpected error: {body}"
    );
}

#[tokio::test]
#[ignore = "Requires running API server with database"]
async fn test_login_and_me() {
    let ctx = TestContext::new();
    let user = ctx.register().await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": user.email, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = ctx.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user.id);
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
#[ignore = "Requires running API server with database"]
async fn test_wrong_password_rejected() {
    let ctx = TestContext::new();
    let user = ctx.register().await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": user.email, "password": "not-the-password" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

// ============================================================================
// Admin Access
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server with database"]
async fn test_admin_routes_require_token() {
    let ctx = TestContext::new();

    for path in ["/api/admin/products", "/api/admin/users/1"] {
        let (status, body) = ctx.send(Method::GET, path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}: {body}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
#[ignore = "Requires running API server with database"]
async fn test_admin_routes_forbid_shoppers() {
    let ctx = TestContext::new();
    let user = ctx.register().await;

    let products = ctx
        .send(Method::GET, "/api/admin/products", Some(&user.token), None)
        .await;
    assert_eq!(products.0, StatusCode::FORBIDDEN, "{}", products.1);

    let path = format!("/api/admin/users/{}", user.id);
    let (status, body) = ctx.send(Method::GET, &path, Some(&user.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert_eq!(body["error"], "Admin access required");
}

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_admin_can_read_user() {
    let ctx = TestContext::new();
    let user = ctx.register().await;

    let path = format!("/api/admin/users/{}", user.id);
    let (status, body) = ctx.send(Method::GET, &path, Some(&admin_token()), None).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["email"], user.email);
}
