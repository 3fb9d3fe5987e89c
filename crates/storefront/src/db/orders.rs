//! Order repository for database operations.
//!
//! Orders are written once and never updated. The line snapshots are
//! stored as a JSONB column: the order is a self-contained document,
//! deliberately decoupled from the catalog rows it was created from.

use sqlx::{PgPool, Row, postgres::PgRow};

use copperleaf_core::{Email, NewOrder, Order, OrderCustomer, OrderId, OrderLine, UserId};

use super::{OrderStore, RepositoryError};

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    /// Returns `RepositoryError::DataCorruption` if the lines cannot be
    /// serialized.
    pub async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let lines_json = serde_json::to_value(&order.lines).map_err(|e| {
            RepositoryError::DataCorruption(format!("failed to serialize order lines: {e}"))
        })?;

        let row = sqlx::query(
            "INSERT INTO orders (user_id, user_email, lines)
             VALUES ($1, $2, $3)
             RETURNING id, user_id, user_email, lines, placed_at",
        )
        .bind(order.customer.user_id)
        .bind(order.customer.email.as_str())
        .bind(lines_json)
        .fetch_one(self.pool)
        .await?;

        map_order(&row)
    }

    /// Get an order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value cannot
    /// be decoded.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, user_email, lines, placed_at FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.as_ref().map(map_order).transpose()
    }

    /// List all orders placed by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored value cannot
    /// be decoded.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, user_email, lines, placed_at
             FROM orders
             WHERE user_id = $1
             ORDER BY placed_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_order).collect()
    }
}

impl OrderStore for OrderRepository<'_> {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.insert(order).await
    }
}

/// Map a database row into the `Order` domain type.
fn map_order(row: &PgRow) -> Result<Order, RepositoryError> {
    let email_raw: String = row.try_get("user_email")?;
    let email = Email::parse(&email_raw).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
    })?;

    let lines_json: serde_json::Value = row.try_get("lines")?;
    let lines: Vec<OrderLine> = serde_json::from_value(lines_json).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid order lines in database: {e}"))
    })?;

    Ok(Order {
        id: row.try_get("id")?,
        customer: OrderCustomer {
            user_id: row.try_get("user_id")?,
            email,
        },
        lines,
        placed_at: row.try_get("placed_at")?,
    })
}
