//! In-memory store used by service tests.
//!
//! Implements the same store traits as the sqlx repositories, including
//! the compare-and-swap semantics of `save_cart`, so cart and checkout
//! logic can be exercised without a database. Failure injection flags
//! simulate store outages at the two points the checkout sequence cares
//! about: order insert and cart clear.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use copperleaf_core::{Cart, NewOrder, Order, OrderId, Product, ProductId, UserId};

use super::{OrderStore, ProductStore, RepositoryError, UserStore};
use crate::models::User;

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    orders: Vec<Order>,
    next_order_id: i32,
}

/// In-memory implementation of the store traits.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_order_insert: AtomicBool,
    fail_cart_clear: AtomicBool,
    fail_cart_save: AtomicBool,
}

/// The error every injected failure surfaces as.
fn injected_failure() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolClosed)
}

#[allow(clippy::unwrap_used)] // lock poisoning only happens after a test already panicked
impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user.
    pub fn insert_user(&self, user: User) {
        self.inner.lock().unwrap().users.insert(user.id, user);
    }

    /// Seed a product.
    pub fn insert_product(&self, product: Product) {
        self.inner
            .lock()
            .unwrap()
            .products
            .insert(product.id, product);
    }

    /// Remove a product, simulating catalog deletion under a live cart.
    pub fn remove_product(&self, id: ProductId) {
        self.inner.lock().unwrap().products.remove(&id);
    }

    /// Current state of a user.
    #[must_use]
    pub fn user(&self, id: UserId) -> Option<User> {
        self.inner.lock().unwrap().users.get(&id).cloned()
    }

    /// All orders inserted so far.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.inner.lock().unwrap().orders.clone()
    }

    /// Make the next `insert_order` calls fail.
    pub fn fail_order_insert(&self, fail: bool) {
        self.fail_order_insert.store(fail, Ordering::SeqCst);
    }

    /// Make the next `clear_cart` calls fail.
    pub fn fail_cart_clear(&self, fail: bool) {
        self.fail_cart_clear.store(fail, Ordering::SeqCst);
    }

    /// Make the next `save_cart` calls fail outright (not a version
    /// conflict).
    pub fn fail_cart_save(&self, fail: bool) {
        self.fail_cart_save.store(fail, Ordering::SeqCst);
    }
}

#[allow(clippy::unwrap_used)]
impl UserStore for MemoryStore {
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn save_cart(
        &self,
        user_id: UserId,
        cart: &Cart,
        expected_version: i64,
    ) -> Result<i64, RepositoryError> {
        if self.fail_cart_save.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(RepositoryError::NotFound)?;

        if user.cart_version != expected_version {
            return Err(RepositoryError::VersionConflict);
        }

        user.cart = cart.clone();
        user.cart_version += 1;
        user.updated_at = Utc::now();
        Ok(user.cart_version)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
        if self.fail_cart_clear.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or(RepositoryError::NotFound)?;

        user.cart = Cart::empty();
        user.cart_version += 1;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[allow(clippy::unwrap_used)]
impl ProductStore for MemoryStore {
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.inner.lock().unwrap().products.get(&id).cloned())
    }

    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }
}

#[allow(clippy::unwrap_used)]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        if self.fail_order_insert.load(Ordering::SeqCst) {
            return Err(injected_failure());
        }

        let mut inner = self.inner.lock().unwrap();
        inner.next_order_id += 1;
        let stored = Order {
            id: OrderId::new(inner.next_order_id),
            customer: order.customer,
            lines: order.lines,
            placed_at: Utc::now(),
        };
        inner.orders.push(stored.clone());
        Ok(stored)
    }
}

// Delegation impls so concurrent tests can share one store across tasks.

impl UserStore for std::sync::Arc<MemoryStore> {
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        UserStore::user_by_id(&**self, id).await
    }

    async fn save_cart(
        &self,
        user_id: UserId,
        cart: &Cart,
        expected_version: i64,
    ) -> Result<i64, RepositoryError> {
        UserStore::save_cart(&**self, user_id, cart, expected_version).await
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
        UserStore::clear_cart(&**self, user_id).await
    }
}

impl ProductStore for std::sync::Arc<MemoryStore> {
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        ProductStore::product_by_id(&**self, id).await
    }

    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        ProductStore::products_by_ids(&**self, ids).await
    }
}

impl OrderStore for std::sync::Arc<MemoryStore> {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        OrderStore::insert_order(&**self, order).await
    }
}
