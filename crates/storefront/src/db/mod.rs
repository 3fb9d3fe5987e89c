//! Database operations for the storefront `PostgreSQL`.
//!
//! # Tables
//!
//! - `users` - Authentication, the embedded cart document (`cart` JSONB +
//!   `cart_version`), and the password-reset token pair
//! - `products` - The catalog
//! - `orders` - Immutable order records; line snapshots live in a JSONB
//!   column
//! - `sessions` - Tower-sessions storage
//!
//! # Store traits
//!
//! [`UserStore`], [`ProductStore`], and [`OrderStore`] are the seams the
//! cart and checkout services are injected with. Production code passes
//! the sqlx repositories below; tests pass the in-memory store. Queries
//! are runtime-bound (`sqlx::query` + manual row mapping), so no live
//! database is needed at compile time.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p copperleaf-cli -- migrate
//! ```

#[cfg(test)]
pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use copperleaf_core::{Cart, NewOrder, Order, Product, ProductId, UserId};

use crate::models::User;

/// Errors surfaced by repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The referenced record does not exist.
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An optimistic write lost the race: the record's version moved
    /// between read and write. Re-read and retry.
    #[error("stale write: record version has moved")]
    VersionConflict,

    /// A stored value could not be decoded into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Store handle for user records and the embedded cart document.
pub trait UserStore {
    /// Load a user by id.
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Persist a new cart value for the user, compare-and-swap style.
    ///
    /// The write only lands if the stored `cart_version` still equals
    /// `expected_version`; otherwise [`RepositoryError::VersionConflict`]
    /// is returned and the caller should re-read and retry. Returns the
    /// new version on success.
    async fn save_cart(
        &self,
        user_id: UserId,
        cart: &Cart,
        expected_version: i64,
    ) -> Result<i64, RepositoryError>;

    /// Unconditionally empty the user's cart in a single atomic write.
    ///
    /// Used after order materialization, where the original cart contents
    /// have already been consumed into the order.
    async fn clear_cart(&self, user_id: UserId) -> Result<(), RepositoryError>;
}

/// Store handle for catalog lookups.
pub trait ProductStore {
    /// Load a product by id. `None` for ids that no longer exist.
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Load all products matching the given ids. Missing ids are simply
    /// absent from the result; the caller decides what a dangling
    /// reference means.
    async fn products_by_ids(&self, ids: &[ProductId])
    -> Result<Vec<Product>, RepositoryError>;
}

/// Store handle for order persistence.
pub trait OrderStore {
    /// Persist a new order and return the stored record.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
