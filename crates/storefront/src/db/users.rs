//! User repository for database operations.
//!
//! Users carry their cart as an embedded JSONB document plus a
//! `cart_version` counter. Cart writes go through [`UserStore::save_cart`]
//! (compare-and-swap on the version) or [`UserStore::clear_cart`]
//! (unconditional, single-statement). Queries are runtime-bound and rows
//! are mapped by hand into domain types.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use copperleaf_core::{Cart, Email, UserId};

use super::{RepositoryError, UserStore};
use crate::models::{PasswordReset, User};

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

const USER_COLUMNS: &str = "id, email, password_hash, cart, cart_version, \
     reset_token, reset_token_expires_at, created_at, updated_at";

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value cannot
    /// be decoded.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(|r| map_user(&r)).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value cannot
    /// be decoded.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| map_user(&r)).transpose()
    }

    /// Create a new user with email and password hash. The cart starts
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        map_user(&row)
    }

    /// Get a user's password hash by email.
    ///
    /// Returns `None` if the user doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let Some(user) = self.get_by_email(email).await? else {
            return Ok(None);
        };

        let row = sqlx::query("SELECT password_hash FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(self.pool)
            .await?;
        let password_hash: String = row.try_get("password_hash")?;

        Ok(Some((user, password_hash)))
    }

    /// Store a password-reset token pair for the user.
    ///
    /// Replaces any outstanding reset. Token and expiry are written
    /// together; the schema enforces that they are both set or both null.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_reset_token(
        &self,
        user_id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users
             SET reset_token = $1, reset_token_expires_at = $2, updated_at = now()
             WHERE id = $3",
        )
        .bind(token)
        .bind(expires_at)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Find the user holding an unexpired reset token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value cannot
    /// be decoded.
    pub async fn find_by_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE reset_token = $1 AND reset_token_expires_at > now()"
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| map_user(&r)).transpose()
    }

    /// Set a new password hash and clear the reset token pair in one
    /// statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_password_and_clear_reset(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users
             SET password_hash = $1,
                 reset_token = NULL,
                 reset_token_expires_at = NULL,
                 updated_at = now()
             WHERE id = $2",
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

impl UserStore for UserRepository<'_> {
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.get_by_id(id).await
    }

    async fn save_cart(
        &self,
        user_id: UserId,
        cart: &Cart,
        expected_version: i64,
    ) -> Result<i64, RepositoryError> {
        let cart_json = serde_json::to_value(cart).map_err(|e| {
            RepositoryError::DataCorruption(format!("failed to serialize cart: {e}"))
        })?;

        let row = sqlx::query(
            "UPDATE users
             SET cart = $1, cart_version = cart_version + 1, updated_at = now()
             WHERE id = $2 AND cart_version = $3
             RETURNING cart_version",
        )
        .bind(cart_json)
        .bind(user_id)
        .bind(expected_version)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(r.try_get::<i64, _>("cart_version")?),
            // Zero rows: either the user is gone or the version moved.
            None => {
                if self.get_by_id(user_id).await?.is_some() {
                    Err(RepositoryError::VersionConflict)
                } else {
                    Err(RepositoryError::NotFound)
                }
            }
        }
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users
             SET cart = '{\"items\": []}'::jsonb,
                 cart_version = cart_version + 1,
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

/// Map a database row into the `User` domain type.
fn map_user(row: &PgRow) -> Result<User, RepositoryError> {
    let email_raw: String = row.try_get("email")?;
    let email = Email::parse(&email_raw).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
    })?;

    let cart_json: serde_json::Value = row.try_get("cart")?;
    let cart: Cart = serde_json::from_value(cart_json).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid cart document in database: {e}"))
    })?;

    let reset_token: Option<String> = row.try_get("reset_token")?;
    let reset_expires: Option<DateTime<Utc>> = row.try_get("reset_token_expires_at")?;
    let password_reset = match (reset_token, reset_expires) {
        (Some(token), Some(expires_at)) => Some(PasswordReset { token, expires_at }),
        (None, None) => None,
        // The schema check constraint makes a half-set pair unreachable.
        _ => {
            return Err(RepositoryError::DataCorruption(
                "reset token and expiry must be set together".to_owned(),
            ));
        }
    };

    Ok(User {
        id: row.try_get("id")?,
        email,
        cart,
        cart_version: row.try_get("cart_version")?,
        password_reset,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
