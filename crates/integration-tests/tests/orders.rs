//! Checkout and cancellation tests.
//!
//! Run with: `cargo test -p shopfront-integration-tests --test orders -- --ignored`

use reqwest::{Method, StatusCode};
use serde_json::json;

use shopfront_integration_tests::{TestContext, TestUser, admin_token, shipping_address};

/// Put one unit of a fresh product in the user's cart and check out.
async fn place_order(ctx: &TestContext, user: &TestUser) -> i64 {
    let product_id = ctx.create_product("19.99", 20).await;
    order_product(ctx, user, product_id, 1).await
}

/// Check out `quantity` of `product_id`.
async fn order_product(ctx: &TestContext, user: &TestUser, product_id: i64, quantity: i64) -> i64 {
    let (status, body) = ctx
        .add_to_cart(Some(&user.token), None, product_id, quantity)
        .await;
    assert_eq!(status, StatusCode::OK, "add to cart failed: {body}");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/orders",
            Some(&user.token),
            Some(json!({ "shipping_address": shipping_address() })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "checkout failed: {body}");
    assert_eq!(body["data"]["status"], "pending");
    body["data"]["id"].as_i64().expect("order id")
}

async fn set_status(ctx: &TestContext, order_id: i64, status: &str) {
    let path = format!("/api/admin/orders/{order_id}/status");
    let (code, body) = ctx
        .send(
            Method::PUT,
            &path,
            Some(&admin_token()),
            Some(json!({ "status": status })),
        )
        .await;
    assert_eq!(code, StatusCode::OK, "status change to {status} failed: {body}");
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_checkout_empties_cart() {
    let ctx = TestContext::new();
    let user = ctx.register().await;
    let order_id = place_order(&ctx, &user).await;

    let (status, body) = ctx.send(Method::GET, "/api/cart", Some(&user.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], json!([]));

    let path = format!("/api/orders/{order_id}");
    let (status, body) = ctx.send(Method::GET, &path, Some(&user.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "Requires running API server with database"]
async fn test_checkout_with_empty_cart_rejected() {
    let ctx = TestContext::new();
    let user = ctx.register().await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/orders",
            Some(&user.token),
            Some(json!({ "shipping_address": shipping_address() })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_checkout_decrements_stock() {
    let ctx = TestContext::new();
    let user = ctx.register().await;
    let product_id = ctx.create_product("9.50", 10).await;
    assert_eq!(ctx.product_stock(product_id).await, 10);

    order_product(&ctx, &user, product_id, 4).await;

    assert_eq!(ctx.product_stock(product_id).await, 6);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_customer_cancel_restores_stock() {
    let ctx = TestContext::new();
    let user = ctx.register().await;
    let product_id = ctx.create_product("9.50", 10).await;

    let order_id = order_product(&ctx, &user, product_id, 3).await;
    assert_eq!(ctx.product_stock(product_id).await, 7);

    let path = format!("/api/orders/{order_id}/cancel");
    let (status, body) = ctx.send(Method::POST, &path, Some(&user.token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    assert_eq!(ctx.product_stock(product_id).await, 10);
}

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_admin_cancel_restores_stock() {
    let ctx = TestContext::new();
    let user = ctx.register().await;
    let product_id = ctx.create_product("9.50", 10).await;

    let order_id = order_product(&ctx, &user, product_id, 2).await;
    set_status(&ctx, order_id, "processing").await;
    assert_eq!(ctx.product_stock(product_id).await, 8);

    set_status(&ctx, order_id, "cancelled").await;

    assert_eq!(ctx.product_stock(product_id).await, 10);
}

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_only_owner_can_cancel() {
    let ctx = TestContext::new();
    let owner = ctx.register().await;
    let other = ctx.register().await;
    let order_id = place_order(&ctx, &owner).await;
    let path = format!("/api/orders/{order_id}/cancel");

    let (status, body) = ctx.send(Method::POST, &path, Some(&other.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = ctx.send(Method::POST, &path, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");

    // Already cancelled.
    let (status, _) = ctx.send(Method::POST, &path, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_shipped_order_cannot_be_cancelled() {
    let ctx = TestContext::new();
    let owner = ctx.register().await;
    let order_id = place_order(&ctx, &owner).await;

    set_status(&ctx, order_id, "processing").await;
    set_status(&ctx, order_id, "shipped").await;

    let path = format!("/api/orders/{order_id}/cancel");
    let (status, body) = ctx.send(Method::POST, &path, Some(&owner.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(
        body["error"].as_str().unwrap().contains("cannot be cancelled"),
        "unexpected error: {body}"
    );
}
