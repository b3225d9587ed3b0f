//! Guest cart tests.
//!
//! Run with: `cargo test -p shopfront-integration-tests --test cart -- --ignored`

use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use shopfront_integration_tests::{SESSION_HEADER, TestContext, cart_quantity};

fn guest_session() -> String {
    format!("guest-{}", Uuid::new_v4().simple())
}

// ============================================================================
// Guest Sessions
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_guest_cart_persists_under_session_header() {
    let ctx = TestContext::new();
    let product_id = ctx.create_product("12.50", 10).await;
    let session = guest_session();

    let response = ctx
        .client
        .post(ctx.url("/api/cart/items"))
        .header(SESSION_HEADER, &session)
        .json(&json!({ "product_id": product_id, "quantity": 2 }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(SESSION_HEADER).unwrap().to_str().unwrap(),
        session
    );

    let response = ctx
        .client
        .get(ctx.url("/api/cart"))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items.first().unwrap()["product_id"], product_id);
    assert_eq!(items.first().unwrap()["quantity"], 2);
    let subtotal: f64 = body["data"]["subtotal"].as_str().unwrap().parse().unwrap();
    assert!((subtotal - 25.0).abs() < f64::EPSILON);
}

#[tokio::test]
#[ignore = "Requires running API server with database"]
async fn test_new_guest_receives_session() {
    let ctx = TestContext::new();

    let response = ctx
        .client
        .get(ctx.url("/api/cart"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let issued = response
        .headers()
        .get(SESSION_HEADER)
        .expect("session header")
        .to_str()
        .unwrap()
        .to_string();
    assert!(!issued.is_empty());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["items"], json!([]));
}

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_sessions_do_not_share_carts() {
    let ctx = TestContext::new();
    let product_id = ctx.create_product("3.00", 5).await;

    let first = guest_session();
    let second = guest_session();

    let response = ctx
        .client
        .post(ctx.url("/api/cart/items"))
        .header(SESSION_HEADER, &first)
        .json(&json!({ "product_id": product_id }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = ctx
        .client
        .get(ctx.url("/api/cart"))
        .header(SESSION_HEADER, &second)
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["items"], json!([]));
}

// ============================================================================
// Stock Limits
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_add_beyond_stock_rejected() {
    let ctx = TestContext::new();
    let product_id = ctx.create_product("8.00", 3).await;
    let session = guest_session();

    let (status, body) = ctx.add_to_cart(None, Some(&session), product_id, 2).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // 2 already in the cart, 2 more would exceed the 3 in stock
    let (status, body) = ctx.add_to_cart(None, Some(&session), product_id, 2).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "Insufficient stock");

    let body: Value = ctx
        .client
        .get(ctx.url("/api/cart"))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .unwrap();
    assert_eq!(cart_quantity(&body, product_id), 2);
}

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_concurrent_adds_accumulate() {
    let ctx = TestContext::new();
    let product_id = ctx.create_product("1.00", 50).await;
    let session = guest_session();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..5 {
        let client = ctx.client.clone();
        let url = ctx.url("/api/cart/items");
        let session = session.clone();
        tasks.spawn(async move {
            client
                .post(url)
                .header(SESSION_HEADER, session)
                .json(&json!({ "product_id": product_id, "quantity": 1 }))
                .send()
                .await
                .expect("Request failed")
                .status()
        });
    }
    while let Some(status) = tasks.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    let body: Value = ctx
        .client
        .get(ctx.url("/api/cart"))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .unwrap();
    assert_eq!(cart_quantity(&body, product_id), 5);
}

// ============================================================================
// Merge
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and SHOPFRONT_TEST_ADMIN_TOKEN"]
async fn test_merge_sums_quantities_capped_at_stock() {
    let ctx = TestContext::new();
    let user = ctx.register().await;
    let scarce = ctx.create_product("5.00", 5).await;
    let plenty = ctx.create_product("2.00", 10).await;
    let session = guest_session();

    for (token, session, product_id, quantity) in [
        (Some(user.token.as_str()), None, scarce, 3),
        (Some(user.token.as_str()), None, plenty, 1),
        (None, Some(session.as_str()), scarce, 4),
        (None, Some(session.as_str()), plenty, 2),
    ] {
        let (status, body) = ctx.add_to_cart(token, session, product_id, quantity).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let response = ctx
        .client
        .post(ctx.url("/api/cart/merge"))
        .bearer_auth(&user.token)
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(cart_quantity(&body, scarce), 5);
    assert_eq!(cart_quantity(&body, plenty), 3);

    // The guest cart is gone
    let guest: Value = ctx
        .client
        .get(ctx.url("/api/cart"))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .unwrap();
    assert_eq!(guest["data"]["items"], json!([]));
}
