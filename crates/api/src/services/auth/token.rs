//! JWT issuing and verification (HS256).

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use shopfront_core::UserId;

use super::AuthError;
use crate::config::JwtConfig;
use crate::models::User;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// The user ID in `sub`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if `sub` is not a user ID.
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// A signed token and its expiry.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: i64,
}

/// Signing and verification keys.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl TokenKeys {
    /// Build keys from configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_seconds: config.ttl_seconds,
        }
    }

    /// Issue a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if signing fails.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.to_string(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            iat,
            exp: iat + self.ttl_seconds,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<IssuedToken, AuthError> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(AuthError::TokenSigning)?;
        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            expires_at: claims.exp,
        })
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` for an expired token and
    /// `AuthError::InvalidToken` for anything else that fails verification.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use secrecy::SecretString;
    use shopfront_core::Email;

    use super::*;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(&JwtConfig {
            secret: SecretString::from(secret),
            ttl_seconds: 3600,
        })
    }

    fn user() -> User {
        User {
            id: UserId::new(7),
            email: Email::parse("shopper@example.com").unwrap(),
            first_name: None,
            last_name: None,
            phone: None,
            is_active: true,
            is_verified: false,
            is_staff: true,
            is_superuser: false,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys("k8#Vq2!mZ4@pL7$wR1^tY6&uN3*eB9(x");
        let issued = keys.issue(&user()).unwrap();
        assert_eq!(issued.token_type, "Bearer");

        let claims = keys.verify(&issued.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), UserId::new(7));
        assert_eq!(claims.email, "shopper@example.com");
        assert!(claims.is_staff);
        assert!(!claims.is_superuser);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_rejects_token_signed_with_other_key() {
        let issued = keys("k8#Vq2!mZ4@pL7$wR1^tY6&uN3*eB9(x").issue(&user()).unwrap();
        let err = keys("a-completely-different-signing-key!!")
            .verify(&issued.token)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn test_rejects_expired_token() {
        let keys = keys("k8#Vq2!mZ4@pL7$wR1^tY6&uN3*eB9(x");
        let now = Utc::now().timestamp();
        let expired = keys
            .sign(&Claims {
                sub: "7".to_string(),
                email: "shopper@example.com".to_string(),
                is_staff: false,
                is_superuser: false,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();

        let err = keys.verify(&expired.token).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = keys("k8#Vq2!mZ4@pL7$wR1^tY6&uN3*eB9(x")
            .verify("not.a.jwt")
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
