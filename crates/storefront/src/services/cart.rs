//! Cart service: resolution and guarded read-modify-write mutations.
//!
//! The cart transformations themselves are pure (`copperleaf_core::Cart`);
//! this service wraps them in the fetch-transform-persist cycle against
//! the injected stores. Persistence uses the cart's version counter as an
//! optimistic-concurrency token: a save whose base version has moved is
//! rejected by the store, and the cycle is retried with a fresh read so
//! two rapid mutations from the same user cannot overwrite each other.

use thiserror::Error;
use tracing::debug;

use copperleaf_core::{Cart, CartEntry, ProductId, UserId};

use crate::db::{ProductStore, RepositoryError, UserStore};

/// How many times a conflicted cart save is retried before giving up.
const MAX_SAVE_ATTEMPTS: u32 = 3;

/// Errors surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested quantity was zero.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// The product to add does not exist in the catalog.
    #[error("product {0} was not found")]
    UnknownProduct(ProductId),

    /// The acting user does not exist.
    #[error("user not found")]
    UserNotFound,

    /// Every save attempt lost the version race.
    #[error("cart is changing too quickly, giving up after {MAX_SAVE_ATTEMPTS} attempts")]
    Contention,

    /// Underlying store failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cart operations over injected user and product stores.
pub struct CartService<U, P> {
    users: U,
    products: P,
}

impl<U, P> CartService<U, P>
where
    U: UserStore,
    P: ProductStore,
{
    /// Create a new cart service.
    pub const fn new(users: U, products: P) -> Self {
        Self { users, products }
    }

    /// Resolve a cart against the catalog.
    ///
    /// Lines referencing deleted products come back as
    /// [`CartEntry::Unresolved`]; the cart itself is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the catalog lookup fails.
    pub async fn resolve_cart(&self, cart: &Cart) -> Result<Vec<CartEntry>, CartError> {
        let ids: Vec<ProductId> = cart.items().iter().map(|item| item.product_id).collect();
        let products = self.products.products_by_ids(&ids).await?;

        Ok(cart.resolve(|id| products.iter().find(|p| p.id == id)))
    }

    /// Add a product to the user's cart and persist the result.
    ///
    /// The product must exist in the catalog at add time. Returns the
    /// persisted cart value.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero quantity and
    /// `CartError::UnknownProduct` for a dangling id, both before any
    /// store mutation. Returns `CartError::Contention` if every save
    /// attempt lost the version race.
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        self.products
            .product_by_id(product_id)
            .await?
            .ok_or(CartError::UnknownProduct(product_id))?;

        self.mutate_cart(user_id, |cart| cart.add(product_id, quantity))
            .await
    }

    /// Remove a product from the user's cart and persist the result.
    ///
    /// Removing a product that is not in the cart is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Contention` if every save attempt lost the
    /// version race.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, CartError> {
        self.mutate_cart(user_id, |cart| cart.remove(product_id)).await
    }

    /// Run one fetch-transform-persist cycle, retrying on version
    /// conflicts with a fresh read each time.
    async fn mutate_cart<F>(&self, user_id: UserId, transform: F) -> Result<Cart, CartError>
    where
        F: Fn(Cart) -> Cart,
    {
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let user = self
                .users
                .user_by_id(user_id)
                .await?
                .ok_or(CartError::UserNotFound)?;

            let updated = transform(user.cart);
            match self
                .users
                .save_cart(user_id, &updated, user.cart_version)
                .await
            {
                Ok(_) => return Ok(updated),
                Err(RepositoryError::VersionConflict) => {
                    debug!(%user_id, attempt, "cart version moved, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CartError::Contention)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::Utc;
    use rust_decimal::Decimal;

    use copperleaf_core::{CurrencyCode, Email, Price, Product};

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::User;

    fn test_user(id: i32) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(id),
            email: Email::parse(&format!("user{id}@example.com")).unwrap(),
            cart: Cart::empty(),
            cart_version: 0,
            password_reset: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_product(id: i32, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            price: Price::new(Decimal::from(price), CurrencyCode::USD),
            description: "A test product.".to_owned(),
            image_url: format!("images/{id}.png"),
            owner_id: UserId::new(99),
            created_at: now,
            updated_at: now,
        }
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(test_user(1));
        store.insert_product(test_product(10, 10));
        store.insert_product(test_product(20, 5));
        store
    }

    #[tokio::test]
    async fn add_item_persists_the_merged_cart() {
        let store = seeded_store();
        let service = CartService::new(Arc::clone(&store), Arc::clone(&store));

        let cart = service
            .add_item(UserId::new(1), ProductId::new(10), 1)
            .await
            .unwrap();
        assert_eq!(cart.quantity_of(ProductId::new(10)), Some(1));

        let cart = service
            .add_item(UserId::new(1), ProductId::new(10), 1)
            .await
            .unwrap();
        assert_eq!(cart.quantity_of(ProductId::new(10)), Some(2));

        let persisted = store.user(UserId::new(1)).unwrap();
        assert_eq!(persisted.cart, cart);
        assert_eq!(persisted.cart_version, 2);
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected_before_any_store_write() {
        let store = seeded_store();
        store.fail_cart_save(true); // a write would blow up the test
        let service = CartService::new(Arc::clone(&store), Arc::clone(&store));

        let result = service.add_item(UserId::new(1), ProductId::new(10), 0).await;
        assert!(matches!(result, Err(CartError::InvalidQuantity)));
    }

    #[tokio::test]
    async fn adding_an_unknown_product_fails() {
        let store = seeded_store();
        let service = CartService::new(Arc::clone(&store), Arc::clone(&store));

        let result = service
            .add_item(UserId::new(1), ProductId::new(404), 1)
            .await;
        assert!(
            matches!(result, Err(CartError::UnknownProduct(id)) if id == ProductId::new(404))
        );
        assert!(store.user(UserId::new(1)).unwrap().cart.is_empty());
    }

    #[tokio::test]
    async fn removing_an_absent_product_is_a_no_op() {
        let store = seeded_store();
        let service = CartService::new(Arc::clone(&store), Arc::clone(&store));

        let cart = service
            .remove_item(UserId::new(1), ProductId::new(10))
            .await
            .unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn resolve_flags_deleted_products() {
        let store = seeded_store();
        let service = CartService::new(Arc::clone(&store), Arc::clone(&store));

        service
            .add_item(UserId::new(1), ProductId::new(10), 1)
            .await
            .unwrap();
        service
            .add_item(UserId::new(1), ProductId::new(20), 1)
            .await
            .unwrap();
        store.remove_product(ProductId::new(20));

        let user = store.user(UserId::new(1)).unwrap();
        let entries = service.resolve_cart(&user.cart).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].product().is_some());
        assert!(matches!(
            entries[1],
            CartEntry::Unresolved { product_id, .. } if product_id == ProductId::new(20)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_adds_are_not_lost() {
        let store = seeded_store();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let service = CartService::new(Arc::clone(&store), store);
                    service.add_item(UserId::new(1), ProductId::new(10), 1).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // Both increments must land regardless of interleaving.
        let user = store.user(UserId::new(1)).unwrap();
        assert_eq!(user.cart.quantity_of(ProductId::new(10)), Some(2));
        assert_eq!(user.cart_version, 2);
    }

    /// Store wrapper that lets another writer win exactly once, right
    /// before the service's first save lands.
    struct RaceOnce {
        inner: Arc<MemoryStore>,
        raced: AtomicBool,
    }

    impl UserStore for RaceOnce {
        async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
            self.inner.user_by_id(id).await
        }

        async fn save_cart(
            &self,
            user_id: UserId,
            cart: &Cart,
            expected_version: i64,
        ) -> Result<i64, RepositoryError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                let user = self.inner.user(user_id).ok_or(RepositoryError::NotFound)?;
                let winner = user.cart.add(ProductId::new(20), 1);
                self.inner
                    .save_cart(user_id, &winner, user.cart_version)
                    .await?;
            }
            self.inner.save_cart(user_id, cart, expected_version).await
        }

        async fn clear_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
            self.inner.clear_cart(user_id).await
        }
    }

    #[tokio::test]
    async fn a_conflicted_save_is_retried_with_a_fresh_read() {
        let store = seeded_store();
        let racing = RaceOnce {
            inner: Arc::clone(&store),
            raced: AtomicBool::new(false),
        };
        let service = CartService::new(racing, Arc::clone(&store));

        let cart = service
            .add_item(UserId::new(1), ProductId::new(10), 1)
            .await
            .unwrap();

        // The retried write merged on top of the interleaved one.
        assert_eq!(cart.quantity_of(ProductId::new(10)), Some(1));
        assert_eq!(cart.quantity_of(ProductId::new(20)), Some(1));
        assert_eq!(store.user(UserId::new(1)).unwrap().cart, cart);
    }
}
