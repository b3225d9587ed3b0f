//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `SHOPFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOPFRONT_PORT` - Listen port (default: 8000)
//! - `SHOPFRONT_BASE_URL` - Public URL of the API (default: `http://localhost:8000`)
//! - `JWT_TTL_SECONDS` - Token lifetime (default: 86400)
//! - `CORS_ALLOWED_ORIGINS` - Comma-separated origins, or `*` (default: none)
//! - `UPLOAD_DIR` - Directory for uploaded images (default: uploads)
//! - `UPLOAD_MAX_BYTES` - Maximum upload size (default: 5 MiB)
//! - `STRIPE_SECRET_KEY` - Stripe secret key; payments are disabled without it
//! - `STRIPE_CURRENCY` - ISO currency for payment intents (default: usd)
//! - `SHIPPING_FLAT_RATE` - Flat shipping charge (default: 5.99)
//! - `FREE_SHIPPING_THRESHOLD` - Subtotal for free shipping, empty disables (default: 50.00)
//! - `TAX_RATE` - Tax fraction, e.g. 0.08 (default: 0)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use shopfront_core::pricing::PricingRules;
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_UPLOAD_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Token signing settings
    pub jwt: JwtConfig,
    /// Origins allowed to call the API from a browser
    pub cors: CorsOrigins,
    /// Image upload settings
    pub uploads: UploadConfig,
    /// Stripe settings, `None` when payments are disabled
    pub stripe: Option<StripeConfig>,
    /// Shipping and tax rules
    pub pricing: PricingRules,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// JWT signing configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC secret for HS256
    pub secret: SecretString,
    /// Token lifetime in seconds
    pub ttl_seconds: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// Browser origins allowed by CORS.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CorsOrigins {
    /// No cross-origin access.
    #[default]
    None,
    /// Any origin (`*`).
    Any,
    /// An explicit list of origins.
    List(Vec<String>),
}

/// Upload storage configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory the files are written to
    pub dir: PathBuf,
    /// Maximum accepted file size in bytes
    pub max_bytes: usize,
}

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...` or restricted `rk_...`)
    pub secret_key: SecretString,
    /// Lowercase ISO 4217 currency code
    pub currency: String,
    /// API base URL, overridable for tests
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("currency", &self.currency)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SHOPFRONT_DATABASE_URL")?;
        let host = parse_env("SHOPFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("SHOPFRONT_PORT", "8000")?;
        let base_url = get_env_or_default("SHOPFRONT_BASE_URL", "http://localhost:8000");
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let jwt = JwtConfig::from_env()?;
        let cors = parse_cors_origins(&get_env_or_default("CORS_ALLOWED_ORIGINS", ""));
        let uploads = UploadConfig::from_env()?;
        let stripe = StripeConfig::from_env()?;
        let pricing = pricing_from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            jwt,
            cors,
            uploads,
            stripe,
            pricing,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the API is served over HTTPS (controls secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&secret, "JWT_SECRET")?;
        let ttl_seconds: i64 = parse_env("JWT_TTL_SECONDS", "86400")?;
        if ttl_seconds <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_TTL_SECONDS".to_string(),
                "must be positive".to_string(),
            ));
        }
        Ok(Self {
            secret,
            ttl_seconds,
        })
    }
}

impl UploadConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dir: PathBuf::from(get_env_or_default("UPLOAD_DIR", "uploads")),
            max_bytes: parse_env("UPLOAD_MAX_BYTES", &DEFAULT_UPLOAD_MAX_BYTES.to_string())?,
        })
    }
}

impl StripeConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(key) = get_optional_env("STRIPE_SECRET_KEY").filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        if !(key.starts_with("sk_") || key.starts_with("rk_")) {
            return Err(ConfigError::InvalidEnvVar(
                "STRIPE_SECRET_KEY".to_string(),
                "must be a secret (sk_) or restricted (rk_) key".to_string(),
            ));
        }
        Ok(Some(Self {
            secret_key: SecretString::from(key),
            currency: get_env_or_default("STRIPE_CURRENCY", "usd").to_lowercase(),
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
        }))
    }
}

fn pricing_from_env() -> Result<PricingRules, ConfigError> {
    let threshold = get_env_or_default("FREE_SHIPPING_THRESHOLD", "50.00");
    let free_shipping_threshold = if threshold.trim().is_empty() {
        None
    } else {
        Some(parse_decimal("FREE_SHIPPING_THRESHOLD", &threshold)?)
    };

    Ok(PricingRules {
        shipping_flat_rate: parse_decimal(
            "SHIPPING_FLAT_RATE",
            &get_env_or_default("SHIPPING_FLAT_RATE", "5.99"),
        )?,
        free_shipping_threshold,
        tax_rate: parse_decimal("TAX_RATE", &get_env_or_default("TAX_RATE", "0"))?,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a comma-separated origin list.
fn parse_cors_origins(raw: &str) -> CorsOrigins {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect();

    if origins.iter().any(|o| o == "*") {
        CorsOrigins::Any
    } else if origins.is_empty() {
        CorsOrigins::None
    } else {
        CorsOrigins::List(origins)
    }
}

/// Parse a non-negative decimal setting.
fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    let parsed = Decimal::from_str(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if parsed.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(parsed)
}

/// Parse an environment variable, falling back to a default.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-jwt-key-here", "JWT_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "JWT_SECRET");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "JWT_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "JWT_SECRET").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_parse_cors_origins() {
        assert_eq!(parse_cors_origins(""), CorsOrigins::None);
        assert_eq!(parse_cors_origins(" * "), CorsOrigins::Any);
        assert_eq!(
            parse_cors_origins("http://localhost:5173/, https://shop.test"),
            CorsOrigins::List(vec![
                "http://localhost:5173".to_string(),
                "https://shop.test".to_string()
            ])
        );
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(
            parse_decimal("TAX_RATE", "0.08").unwrap(),
            Decimal::new(8, 2)
        );
        assert!(parse_decimal("TAX_RATE", "-1").is_err());
        assert!(parse_decimal("TAX_RATE", "abc").is_err());
    }

    #[test]
    fn test_jwt_config_debug_redacts_secret() {
        let config = JwtConfig {
            secret: SecretString::from("super_secret_signing_value"),
            ttl_seconds: 60,
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_signing_value"));
    }
}
