//! Integration tests for Shopfront.
//!
//! Every test is `#[ignore]`d and talks to a running server over HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the API against a migrated database
//! cargo run -p shopfront-cli -- migrate
//! cargo run -p shopfront-api
//!
//! # Run integration tests
//! SHOPFRONT_BASE_URL=http://localhost:8000 \
//! SHOPFRONT_TEST_ADMIN_TOKEN=... \
//!     cargo test -p shopfront-integration-tests -- --ignored
//! ```
//!
//! `SHOPFRONT_TEST_ADMIN_TOKEN` is a bearer token for a staff account, e.g.
//! from `POST /api/auth/login` after `sf-cli user create --staff`.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode, header::RETRY_AFTER};
use serde_json::{Value, json};
use uuid::Uuid;

/// Header carrying the guest cart session.
pub const SESSION_HEADER: &str = "x-session-id";

/// Password used for every account the tests register.
pub const TEST_PASSWORD: &str = "integration-pass-123";

/// Attempts made when the auth rate limiter answers 429.
const RATE_LIMIT_ATTEMPTS: u32 = 5;

/// HTTP client and server location shared by a test.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

/// A freshly registered shopper.
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub token: String,
}

impl TestContext {
    /// Create a context for the server at `SHOPFRONT_BASE_URL`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request and decode the JSON envelope.
    ///
    /// # Panics
    ///
    /// Panics if the server is unreachable or the body is not JSON.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self.client.request(method.clone(), self.url(path));
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }

            let response = request.send().await.expect("Request failed");
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < RATE_LIMIT_ATTEMPTS {
                let wait = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(6);
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let body = response.json().await.expect("Response is not JSON");
            return (status, body);
        }
    }

    /// Register a new shopper with a unique email.
    ///
    /// # Panics
    ///
    /// Panics if registration does not return 201.
    pub async fn register(&self) -> TestUser {
        let email = unique_email();
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "password": TEST_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        TestUser {
            id: body["data"]["user"]["id"].as_i64().expect("user id"),
            email,
            token: body["data"]["token"]
                .as_str()
                .expect("token")
                .to_string(),
        }
    }

    /// Create an active product through the admin API.
    ///
    /// # Panics
    ///
    /// Panics if the admin token is missing or the product is rejected.
    pub async fn create_product(&self, price: &str, stock: i32) -> i64 {
        let name = format!("Test Product {}", Uuid::new_v4().simple());
        let (status, body) = self
            .send(
                Method::POST,
                "/api/admin/products",
                Some(&admin_token()),
                Some(json!({
                    "name": name,
                    "price": price,
                    "stock_quantity": stock,
                    "is_active": true,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product failed: {body}");
        body["data"]["id"].as_i64().expect("product id")
    }

    /// Add a product to a cart owned by `token` or by the guest `session`.
    ///
    /// # Panics
    ///
    /// Panics if the server is unreachable or the body is not JSON.
    pub async fn add_to_cart(
        &self,
        token: Option<&str>,
        session: Option<&str>,
        product_id: i64,
        quantity: i64,
    ) -> (StatusCode, Value) {
        let mut request = self
            .client
            .post(self.url("/api/cart/items"))
            .json(&json!({ "product_id": product_id, "quantity": quantity }));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request.send().await.expect("Request failed");
        let status = response.status();
        (status, response.json().await.expect("Response is not JSON"))
    }

    /// Current `stock_quantity` of a product, as the public catalog reports it.
    ///
    /// # Panics
    ///
    /// Panics if the product cannot be read.
    pub async fn product_stock(&self, product_id: i64) -> i64 {
        let path = format!("/api/products/{product_id}");
        let (status, body) = self.send(Method::GET, &path, None, None).await;
        assert_eq!(status, StatusCode::OK, "read product failed: {body}");
        body["data"]["stock_quantity"].as_i64().expect("stock_quantity")
    }
}

/// Quantity of `product_id` in a cart view, zero when absent.
#[must_use]
pub fn cart_quantity(cart: &Value, product_id: i64) -> i64 {
    cart["data"]["items"]
        .as_array()
        .into_iter()
        .flatten()
        .find(|item| item["product_id"] == product_id)
        .and_then(|item| item["quantity"].as_i64())
        .unwrap_or(0)
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("SHOPFRONT_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:8000".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Bearer token of a staff account.
///
/// # Panics
///
/// Panics if `SHOPFRONT_TEST_ADMIN_TOKEN` is not set.
#[must_use]
pub fn admin_token() -> String {
    std::env::var("SHOPFRONT_TEST_ADMIN_TOKEN").expect("SHOPFRONT_TEST_ADMIN_TOKEN must be set")
}

/// An email address no previous run has used.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@example.com", Uuid::new_v4().simple())
}

/// A complete shipping address.
#[must_use]
pub fn shipping_address() -> Value {
    json!({
        "name": "Test Shopper",
        "line1": "1 Integration Way",
        "city": "Testville",
        "postal_code": "12345",
        "country": "US",
    })
}
