//! Order materialization: cart state in, immutable order out.
//!
//! Checkout converts a resolved cart into a durable [`Order`] whose lines
//! are full copies of the product data at purchase time, then empties the
//! source cart. The sequence is strict: the cart is only cleared after
//! the order insert succeeded, and a failure in either step is surfaced
//! as its own error variant so callers can tell "nothing happened" from
//! "the order exists but the cart is stale".

mod error;

pub use error::CheckoutError;

use tracing::info;

use copperleaf_core::{
    CartEntry, NewOrder, Order, OrderCustomer, OrderLine, ProductSnapshot,
};

use crate::db::{OrderStore, UserStore};
use crate::models::User;
use crate::payments::{PaymentProvider, PaymentSessionStatus};

/// Order materialization over injected user and order stores.
pub struct CheckoutService<U, O> {
    users: U,
    orders: O,
}

impl<U, O> CheckoutService<U, O>
where
    U: UserStore,
    O: OrderStore,
{
    /// Create a new checkout service.
    pub const fn new(users: U, orders: O) -> Self {
        Self { users, orders }
    }

    /// Verify a payment session and, if complete, materialize the order.
    ///
    /// The provider is asked for the session's current status server-side;
    /// a session that is not complete never creates an order. This is the
    /// only entry point the success route uses, so a forged return URL
    /// cannot mint orders.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::PaymentIncomplete` for open or expired
    /// sessions, `CheckoutError::Payment` if the provider cannot be
    /// consulted, and otherwise whatever [`Self::place_order`] returns.
    pub async fn confirm_and_place<P>(
        &self,
        provider: &P,
        session_id: &str,
        user: &User,
        entries: &[CartEntry],
    ) -> Result<Order, CheckoutError>
    where
        P: PaymentProvider,
    {
        match provider.session_status(session_id).await? {
            PaymentSessionStatus::Complete => self.place_order(user, entries).await,
            status => Err(CheckoutError::PaymentIncomplete(status)),
        }
    }

    /// Materialize an order from resolved cart entries, then clear the
    /// source cart.
    ///
    /// Every entry must be resolved; product fields are copied verbatim
    /// into the order's snapshots so later catalog changes cannot touch
    /// it. Totals are not stored; they derive from the snapshots at
    /// render time.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::EmptyCart` / `CheckoutError::UnresolvedItem`:
    ///   rejected before any store mutation.
    /// - `CheckoutError::OrderPersist`: the insert failed, cart untouched.
    /// - `CheckoutError::CartClearFailed`: the order was committed but the
    ///   clear step failed; carries the committed order id.
    pub async fn place_order(
        &self,
        user: &User,
        entries: &[CartEntry],
    ) -> Result<Order, CheckoutError> {
        if entries.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                CartEntry::Resolved { quantity, product } => lines.push(OrderLine {
                    quantity: *quantity,
                    product: ProductSnapshot::from(product),
                }),
                CartEntry::Unresolved { product_id, .. } => {
                    return Err(CheckoutError::UnresolvedItem(*product_id));
                }
            }
        }

        let order = self
            .orders
            .insert_order(NewOrder {
                customer: OrderCustomer {
                    user_id: user.id,
                    email: user.email.clone(),
                },
                lines,
            })
            .await
            .map_err(CheckoutError::OrderPersist)?;

        info!(order_id = %order.id, user_id = %user.id, units = order.unit_count(), "order placed");

        match self.users.clear_cart(user.id).await {
            Ok(()) => Ok(order),
            Err(source) => Err(CheckoutError::CartClearFailed {
                order_id: order.id,
                source,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use copperleaf_core::{
        Cart, CurrencyCode, Email, Price, Product, ProductId, UserId,
    };

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::payments::PaymentError;
    use crate::services::cart::CartService;

    fn test_user(id: i32) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(id),
            email: Email::parse("buyer@example.com").unwrap(),
            cart: Cart::empty(),
            cart_version: 0,
            password_reset: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_product(id: i32, title: &str, price: &str) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            title: title.to_owned(),
            price: Price::new(price.parse().unwrap(), CurrencyCode::USD),
            description: format!("{title} description"),
            image_url: format!("images/{id}.png"),
            owner_id: UserId::new(99),
            created_at: now,
            updated_at: now,
        }
    }

    /// Seed a store with a user whose cart holds 2x product A and 1x
    /// product B, and return (store, user with current cart state).
    async fn checkout_fixture() -> (Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(test_user(1));
        store.insert_product(test_product(10, "Widget", "10"));
        store.insert_product(test_product(20, "Gadget", "2.50"));

        let carts = CartService::new(Arc::clone(&store), Arc::clone(&store));
        carts.add_item(UserId::new(1), ProductId::new(10), 1).await.unwrap();
        carts.add_item(UserId::new(1), ProductId::new(10), 1).await.unwrap();
        carts.add_item(UserId::new(1), ProductId::new(20), 1).await.unwrap();

        let user = store.user(UserId::new(1)).unwrap();
        (store, user)
    }

    async fn resolved_entries(store: &Arc<MemoryStore>, user: &User) -> Vec<CartEntry> {
        let carts = CartService::new(Arc::clone(store), Arc::clone(store));
        carts.resolve_cart(&user.cart).await.unwrap()
    }

    #[tokio::test]
    async fn checkout_snapshots_products_and_clears_the_cart() {
        let (store, user) = checkout_fixture().await;
        let entries = resolved_entries(&store, &user).await;
        let service = CheckoutService::new(Arc::clone(&store), Arc::clone(&store));

        let order = service.place_order(&user, &entries).await.unwrap();

        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].quantity, 2);
        assert_eq!(order.lines[0].product.title, "Widget");
        assert_eq!(order.lines[0].product.price.amount, Decimal::from(10));
        assert_eq!(order.lines[1].quantity, 1);
        assert_eq!(order.lines[1].product.title, "Gadget");
        assert_eq!(order.customer.user_id, user.id);

        // The source cart is emptied as part of checkout.
        assert!(store.user(user.id).unwrap().cart.is_empty());
    }

    #[tokio::test]
    async fn later_price_changes_do_not_touch_placed_orders() {
        let (store, user) = checkout_fixture().await;
        let entries = resolved_entries(&store, &user).await;
        let service = CheckoutService::new(Arc::clone(&store), Arc::clone(&store));
        let order = service.place_order(&user, &entries).await.unwrap();

        // Reprice the catalog product after the sale.
        store.insert_product(test_product(10, "Widget", "99.99"));

        let stored = store.orders().into_iter().find(|o| o.id == order.id).unwrap();
        assert_eq!(stored.lines[0].product.price.amount, Decimal::from(10));
        assert_eq!(stored.grand_total().amount, "22.50".parse::<Decimal>().unwrap());
    }

    #[tokio::test]
    async fn empty_cart_cannot_be_checked_out() {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(test_user(1));
        let user = store.user(UserId::new(1)).unwrap();
        let service = CheckoutService::new(Arc::clone(&store), Arc::clone(&store));

        let result = service.place_order(&user, &[]).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert!(store.orders().is_empty());
    }

    #[tokio::test]
    async fn unresolved_lines_block_checkout_entirely() {
        let (store, user) = checkout_fixture().await;
        store.remove_product(ProductId::new(20));
        let entries = resolved_entries(&store, &user).await;
        let service = CheckoutService::new(Arc::clone(&store), Arc::clone(&store));

        let result = service.place_order(&user, &entries).await;
        assert!(
            matches!(result, Err(CheckoutError::UnresolvedItem(id)) if id == ProductId::new(20))
        );
        assert!(store.orders().is_empty());
        assert!(!store.user(user.id).unwrap().cart.is_empty());
    }

    #[tokio::test]
    async fn failed_order_insert_leaves_the_cart_untouched() {
        let (store, user) = checkout_fixture().await;
        let entries = resolved_entries(&store, &user).await;
        let service = CheckoutService::new(Arc::clone(&store), Arc::clone(&store));

        store.fail_order_insert(true);
        let result = service.place_order(&user, &entries).await;
        assert!(matches!(result, Err(CheckoutError::OrderPersist(_))));

        // No partial materialization: no order, cart exactly as before.
        assert!(store.orders().is_empty());
        let after = store.user(user.id).unwrap();
        assert_eq!(after.cart, user.cart);
        assert_eq!(after.cart_version, user.cart_version);
    }

    #[tokio::test]
    async fn failed_cart_clear_reports_the_committed_order() {
        let (store, user) = checkout_fixture().await;
        let entries = resolved_entries(&store, &user).await;
        let service = CheckoutService::new(Arc::clone(&store), Arc::clone(&store));

        store.fail_cart_clear(true);
        let result = service.place_order(&user, &entries).await;

        let Err(CheckoutError::CartClearFailed { order_id, .. }) = result else {
            panic!("expected CartClearFailed, got {result:?}");
        };

        // The order is committed exactly once and must not be lost.
        let orders = store.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, order_id);
        // The cart is the recoverable leftover.
        assert!(!store.user(user.id).unwrap().cart.is_empty());
    }

    /// Payment provider stub with a fixed status.
    struct StubProvider(Result<PaymentSessionStatus, ()>);

    impl PaymentProvider for StubProvider {
        async fn create_session(
            &self,
            _line_items: &[crate::payments::PaymentLineItem],
            _success_url: &str,
            _cancel_url: &str,
        ) -> Result<crate::payments::PaymentSession, PaymentError> {
            Err(PaymentError::Request("not used in this stub".to_owned()))
        }

        async fn session_status(
            &self,
            _session_id: &str,
        ) -> Result<PaymentSessionStatus, PaymentError> {
            self.0
                .map_err(|()| PaymentError::Request("provider unreachable".to_owned()))
        }
    }

    #[tokio::test]
    async fn incomplete_payment_sessions_never_materialize() {
        let (store, user) = checkout_fixture().await;
        let entries = resolved_entries(&store, &user).await;
        let service = CheckoutService::new(Arc::clone(&store), Arc::clone(&store));

        for status in [PaymentSessionStatus::Open, PaymentSessionStatus::Expired] {
            let provider = StubProvider(Ok(status));
            let result = service
                .confirm_and_place(&provider, "cs_test_123", &user, &entries)
                .await;
            assert!(matches!(result, Err(CheckoutError::PaymentIncomplete(s)) if s == status));
        }

        let provider = StubProvider(Err(()));
        let result = service
            .confirm_and_place(&provider, "cs_test_123", &user, &entries)
            .await;
        assert!(matches!(result, Err(CheckoutError::Payment(_))));

        assert!(store.orders().is_empty());
        assert!(!store.user(user.id).unwrap().cart.is_empty());
    }

    #[tokio::test]
    async fn complete_payment_sessions_materialize() {
        let (store, user) = checkout_fixture().await;
        let entries = resolved_entries(&store, &user).await;
        let service = CheckoutService::new(Arc::clone(&store), Arc::clone(&store));

        let provider = StubProvider(Ok(PaymentSessionStatus::Complete));
        let order = service
            .confirm_and_place(&provider, "cs_test_123", &user, &entries)
            .await
            .unwrap();

        assert_eq!(store.orders().len(), 1);
        assert_eq!(order.grand_total().amount, "22.50".parse::<Decimal>().unwrap());
        assert!(store.user(user.id).unwrap().cart.is_empty());
    }
}
