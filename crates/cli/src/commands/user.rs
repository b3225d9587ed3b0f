//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a staff account (password prompted from the environment)
//! SHOPFRONT_USER_PASSWORD='...' sf-cli user create -e admin@example.com --staff
//!
//! # Promote an existing account to superuser
//! sf-cli user promote -e admin@example.com --superuser
//! ```

use thiserror::Error;

use shopfront_api::db::{RepositoryError, UserRepository};
use shopfront_api::services::{AuthError, AuthService};
use shopfront_core::Email;

use super::{CommandError, connect};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// No password given on the command line or in the environment.
    #[error("No password given (use --password or SHOPFRONT_USER_PASSWORD)")]
    MissingPassword,

    /// Registration failed (invalid email, weak password, duplicate).
    #[error("Could not create user: {0}")]
    Auth(#[from] AuthError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account has this email.
    #[error("No user with email: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Create an account with the given roles.
///
/// # Errors
///
/// Returns `UserError::Auth` if the email is taken or the password is weak.
pub async fn create(
    email: &str,
    password: Option<String>,
    is_staff: bool,
    is_superuser: bool,
) -> Result<(), UserError> {
    let password = password
        .or_else(|| std::env::var("SHOPFRONT_USER_PASSWORD").ok())
        .ok_or(UserError::MissingPassword)?;

    let pool = connect().await?;
    let user = AuthService::new(&pool)
        .create_with_roles(email, &password, is_staff || is_superuser, is_superuser)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Staff: {}, Superuser: {}",
        user.id,
        user.email,
        user.is_staff,
        user.is_superuser
    );
    Ok(())
}

/// Set the staff and superuser flags of an existing account.
///
/// # Errors
///
/// Returns `UserError::NotFound` if no account has this email.
pub async fn set_roles(email: &str, is_staff: bool, is_superuser: bool) -> Result<(), UserError> {
    let parsed = Email::parse(email).map_err(|_| UserError::InvalidEmail(email.to_owned()))?;

    let pool = connect().await?;
    let user = UserRepository::new(&pool)
        .set_roles(&parsed, is_staff, is_superuser)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => UserError::NotFound(email.to_owned()),
            other => UserError::Repository(other),
        })?;

    tracing::info!(
        "Roles updated for {}: staff={}, superuser={}",
        user.email,
        user.is_staff,
        user.is_superuser
    );
    Ok(())
}
