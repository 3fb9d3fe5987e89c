//! Checkout error types.

use thiserror::Error;

use copperleaf_core::{OrderId, ProductId};

use crate::db::RepositoryError;
use crate::payments::{PaymentError, PaymentSessionStatus};

/// Errors that can occur while materializing an order.
///
/// The two store-failure variants are deliberately distinct:
/// [`CheckoutError::OrderPersist`] means nothing was committed and the
/// cart is untouched, while [`CheckoutError::CartClearFailed`] means the
/// order exists and only the source cart is stale. Callers must not treat
/// the latter as a failed checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout was attempted on an empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line references a product that no longer exists.
    #[error("product {0} is no longer available")]
    UnresolvedItem(ProductId),

    /// The payment session has not completed; no order may be created.
    #[error("payment session is {0}, not complete")]
    PaymentIncomplete(PaymentSessionStatus),

    /// The payment provider could not be consulted.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Persisting the order failed; the cart was left unchanged.
    #[error("failed to persist order: {0}")]
    OrderPersist(#[source] RepositoryError),

    /// The order was persisted but the cart clear failed afterwards.
    ///
    /// Recoverable inconsistency: the order identified here exists and
    /// must not be recreated; only the cart needs reconciling.
    #[error("order {order_id} was placed but clearing the cart failed: {source}")]
    CartClearFailed {
        /// The committed order.
        order_id: OrderId,
        /// The failure that hit the clear step.
        #[source]
        source: RepositoryError,
    },

    /// Any other store failure (e.g., loading the user).
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
