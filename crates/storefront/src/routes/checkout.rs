//! Checkout route handlers.
//!
//! `GET /checkout` reviews the cart and creates a checkout session with
//! the payment provider; the customer is sent to the provider's hosted
//! page. The provider redirects back to `/checkout/success` with the
//! session id, where the session status is verified server-side before
//! the order is materialized. Hitting the success URL with a session that
//! is not complete does nothing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, warn};

use crate::db::{OrderRepository, ProductRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, User, session_keys};
use crate::payments::{PaymentLineItem, PaymentProvider};
use crate::services::cart::CartService;
use crate::services::checkout::{CheckoutError, CheckoutService};
use crate::state::AppState;

use super::cart::CartView;

/// Placeholder the provider substitutes with the real session id on
/// redirect.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Checkout review page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub cart: CartView,
    pub redirect_url: String,
    pub authenticated: bool,
}

/// Query parameters for the success return URL.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

/// Load the acting user and their resolved cart entries.
async fn load_user_and_entries(
    state: &AppState,
    current: &CurrentUser,
) -> Result<(User, Vec<copperleaf_core::CartEntry>)> {
    let users = UserRepository::new(state.pool());
    let user = users
        .get_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_owned()))?;

    let carts = CartService::new(
        UserRepository::new(state.pool()),
        ProductRepository::new(state.pool()),
    );
    let entries = carts.resolve_cart(&user.cart).await?;

    Ok((user, entries))
}

/// Review the cart and create a payment session.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    session: Session,
) -> Result<Response> {
    let (_, entries) = load_user_and_entries(&state, &current).await?;
    let cart = CartView::from_entries(&entries);
    if !cart.ready_for_checkout {
        // Empty or partially unavailable carts go back for editing.
        return Ok(Redirect::to("/cart").into_response());
    }

    let line_items: Vec<PaymentLineItem> = entries
        .iter()
        .filter_map(|entry| {
            entry
                .product()
                .map(|product| PaymentLineItem::from_product(product, entry.quantity()))
        })
        .collect();

    let base_url = state.config().base_url.trim_end_matches('/');
    let success_url =
        format!("{base_url}/checkout/success?session_id={SESSION_ID_PLACEHOLDER}");
    let cancel_url = format!("{base_url}/checkout/cancel");

    let payment_session = state
        .payments()
        .create_session(&line_items, &success_url, &cancel_url)
        .await?;

    // Remember which session this checkout is waiting on, so the return
    // URL cannot be replayed with someone else's session id.
    if let Err(e) = session
        .insert(session_keys::PENDING_PAYMENT_SESSION, &payment_session.id)
        .await
    {
        error!("Failed to store pending payment session: {e}");
        return Err(AppError::Internal("session store failure".to_owned()));
    }

    Ok(CheckoutTemplate {
        cart,
        redirect_url: payment_session.redirect_url,
        authenticated: true,
    }
    .into_response())
}

/// Payment-provider return URL: verify the session, then materialize.
pub async fn success(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    session: Session,
    Query(query): Query<SuccessQuery>,
) -> Result<Response> {
    let Some(session_id) = query.session_id else {
        return Ok(Redirect::to("/checkout").into_response());
    };

    let pending: Option<String> = session
        .get(session_keys::PENDING_PAYMENT_SESSION)
        .await
        .ok()
        .flatten();
    if pending.as_deref() != Some(session_id.as_str()) {
        warn!(%current.id, "success redirect with unexpected payment session id");
        return Err(AppError::BadRequest("unknown payment session".to_owned()));
    }

    let (user, entries) = load_user_and_entries(&state, &current).await?;
    let checkout = CheckoutService::new(
        UserRepository::new(state.pool()),
        OrderRepository::new(state.pool()),
    );

    match checkout
        .confirm_and_place(state.payments(), &session_id, &user, &entries)
        .await
    {
        Ok(_) => {
            let _ = session
                .remove::<String>(session_keys::PENDING_PAYMENT_SESSION)
                .await;
            Ok(Redirect::to("/orders").into_response())
        }
        // The order exists; only the cart is stale. Surface loudly for
        // reconciliation but do not fail the customer's checkout.
        Err(CheckoutError::CartClearFailed { order_id, source }) => {
            error!(%order_id, %source, "order committed but cart clear failed");
            let _ = session
                .remove::<String>(session_keys::PENDING_PAYMENT_SESSION)
                .await;
            Ok(Redirect::to("/orders").into_response())
        }
        Err(CheckoutError::PaymentIncomplete(status)) => {
            warn!(%status, "checkout return with incomplete payment session");
            Ok(Redirect::to("/checkout").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Payment abandoned; back to the cart.
pub async fn cancel() -> Redirect {
    Redirect::to("/cart")
}
