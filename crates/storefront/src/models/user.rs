//! User domain types.
//!
//! These types represent validated domain objects separate from database
//! row types. The user's cart is embedded in the user record and travels
//! with it; `cart_version` is the optimistic-concurrency token for cart
//! writes.

use chrono::{DateTime, Utc};

use copperleaf_core::{Cart, Email, UserId};

/// A storefront user (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// The user's cart, embedded in the user record.
    pub cart: Cart,
    /// Version of the cart document; bumped on every cart write. Cart
    /// saves compare against it so concurrent read-modify-write cycles
    /// cannot silently overwrite each other.
    pub cart_version: i64,
    /// Outstanding password reset, if one was requested.
    pub password_reset: Option<PasswordReset>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// An outstanding password-reset request.
///
/// Token and expiry always travel together: either a reset is pending
/// (both set) or it is not (the whole struct absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordReset {
    /// The opaque reset token mailed to the user.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl PasswordReset {
    /// Whether the token has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
