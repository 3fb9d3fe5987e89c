//! Authentication service.
//!
//! Password registration and login (argon2), plus the password-reset
//! token flow: request issues a random token with a one-hour expiry and
//! stores the pair on the user; completion consumes it and clears both
//! fields together.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;

use copperleaf_core::Email;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw length of a reset token before encoding.
const RESET_TOKEN_BYTES: usize = 32;

/// How long a reset token stays valid.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Authentication service.
///
/// Handles registration, login, and the password-reset flow.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create_with_password(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Start a password reset for the given address.
    ///
    /// Returns the freshly issued token so the caller can mail it, or
    /// `None` if no account matches; callers should respond identically
    /// in both cases so addresses cannot be probed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the token cannot be stored.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, AuthError> {
        let email = Email::parse(email)?;
        let Some(user) = self.users.get_by_email(&email).await? else {
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.users
            .set_reset_token(user.id, &token, expires_at)
            .await?;

        Ok(Some((user, token)))
    }

    /// Load the user behind an unexpired reset token, for pre-filling the
    /// new-password form.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if no live token matches.
    pub async fn user_for_reset_token(&self, token: &str) -> Result<User, AuthError> {
        self.users
            .find_by_reset_token(token)
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }

    /// Complete a password reset: set the new password and clear the
    /// token pair in one store write.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if no live token matches.
    /// Returns `AuthError::WeakPassword` if the new password is rejected.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<User, AuthError> {
        validate_password(new_password)?;

        let user = self
            .users
            .find_by_reset_token(token)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let password_hash = hash_password(new_password)?;
        self.users
            .update_password_and_clear_reset(user.id, &password_hash)
            .await?;

        Ok(user)
    }
}

/// Generate an opaque, URL-safe reset token.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Validate password strength requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with argon2 and a fresh salt.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AuthError::PasswordHash)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2 hash.
fn verify_password(password: &str, stored_hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| AuthError::PasswordHash)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn password_hashing_round_trips() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn each_hash_gets_its_own_salt() {
        let first = hash_password("correct horse battery").unwrap();
        let second = hash_password("correct horse battery").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn reset_tokens_are_unique_and_url_safe() {
        let first = generate_reset_token();
        let second = generate_reset_token();
        assert_ne!(first, second);
        assert!(first.len() >= RESET_TOKEN_BYTES);
        assert!(
            first
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
