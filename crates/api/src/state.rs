//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::CatalogCache;
use crate::services::auth::TokenKeys;
use crate::stripe::{StripeClient, StripeError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenKeys,
    catalog_cache: CatalogCache,
    stripe: Option<StripeClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StripeError> {
        let tokens = TokenKeys::new(&config.jwt);
        let stripe = config.stripe.as_ref().map(StripeClient::new).transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                catalog_cache: CatalogCache::new(),
                stripe,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// JWT signing and verification keys.
    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }

    /// Read-through cache for public catalog reads.
    #[must_use]
    pub fn catalog_cache(&self) -> &CatalogCache {
        &self.inner.catalog_cache
    }

    /// Stripe client, `None` when payments are disabled.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }
}

/// State over a lazy pool that never connects unless a query runs.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn test_state() -> AppState {
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    use crate::config::{CorsOrigins, JwtConfig, UploadConfig};

    let config = ApiConfig {
        database_url: SecretString::from("postgres://shopfront@127.0.0.1:1/shopfront"),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 8000,
        base_url: "http://localhost:8000".to_string(),
        jwt: JwtConfig {
            secret: SecretString::from("k8#Vq2!mZ4@pL7$wR1^tY6&uN3*eB9(x"),
            ttl_seconds: 3600,
        },
        cors: CorsOrigins::None,
        uploads: UploadConfig {
            dir: std::env::temp_dir().join("shopfront-test-uploads"),
            max_bytes: 1024 * 1024,
        },
        stripe: None,
        pricing: shopfront_core::pricing::PricingRules::default(),
        sentry_dsn: None,
        sentry_environment: None,
    };

    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(200))
        .connect_lazy("postgres://shopfront@127.0.0.1:1/shopfront")
        .unwrap();

    AppState::new(config, pool).unwrap()
}
