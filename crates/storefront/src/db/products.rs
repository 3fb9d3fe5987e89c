//! Product repository for catalog database operations.

use sqlx::{PgPool, Row, postgres::PgRow};

use copperleaf_core::{
    CurrencyCode, NewProduct, Price, Product, ProductId, UserId,
};

use super::{ProductStore, RepositoryError};

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

const PRODUCT_COLUMNS: &str =
    "id, title, price, description, image_url, owner_id, created_at, updated_at";

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Count all products in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM products")
            .fetch_one(self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    /// Fetch one page of the catalog, newest first.
    ///
    /// `page` is 1-based.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_product).collect()
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.as_ref().map(map_product).transpose()
    }

    /// Get every product matching the given ids.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw_ids: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&raw_ids)
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_product).collect()
    }

    /// List all products owned by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE owner_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_product).collect()
    }

    /// Create a product owned by the given user.
    ///
    /// Input is expected to be validated (`NewProduct::validate`) before
    /// this is called.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        owner_id: UserId,
        input: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query(&format!(
            "INSERT INTO products (title, price, description, image_url, owner_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.title)
        .bind(input.price.amount)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(owner_id)
        .fetch_one(self.pool)
        .await?;

        map_product(&row)
    }

    /// Update a product, but only if the given user owns it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product matches the id
    /// and owner. Returns `RepositoryError::Database` for other failures.
    pub async fn update(
        &self,
        id: ProductId,
        owner_id: UserId,
        input: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE products
             SET title = $1, price = $2, description = $3, image_url = $4, updated_at = now()
             WHERE id = $5 AND owner_id = $6
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.title)
        .bind(input.price.amount)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        row.as_ref()
            .map(map_product)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product, but only if the given user owns it.
    ///
    /// Orders are unaffected: they hold snapshots, not references, and
    /// carts still pointing at the product surface it as unresolved at
    /// read time.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't
    /// exist or belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId, owner_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl ProductStore for ProductRepository<'_> {
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.get(id).await
    }

    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        self.get_many(ids).await
    }
}

/// Map a database row into the `Product` domain type.
fn map_product(row: &PgRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        price: Price::new(row.try_get("price")?, CurrencyCode::USD),
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        owner_id: row.try_get("owner_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
