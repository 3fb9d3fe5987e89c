//! Cart route handlers.
//!
//! The cart itself lives on the user record; these handlers load it,
//! resolve it against the catalog for display, and funnel mutations
//! through the cart service (which owns the optimistic-retry write
//! cycle).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use copperleaf_core::{CartEntry, CurrencyCode, Price, ProductId};

use crate::db::{ProductRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: i32,
    pub title: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    /// False when the product has been removed from the catalog.
    pub available: bool,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub subtotal: String,
    pub unit_count: u32,
    /// Whether every line resolved against the catalog.
    pub ready_for_checkout: bool,
}

impl CartView {
    /// Create an empty cart view.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            subtotal: Price::new(Decimal::ZERO, CurrencyCode::default()).to_string(),
            unit_count: 0,
            ready_for_checkout: false,
        }
    }

    /// Build the view from resolved cart entries.
    #[must_use]
    pub fn from_entries(entries: &[CartEntry]) -> Self {
        if entries.is_empty() {
            return Self::empty();
        }

        let mut subtotal = Decimal::ZERO;
        let mut currency = CurrencyCode::default();
        let mut unit_count = 0;
        let mut all_resolved = true;

        let lines = entries
            .iter()
            .map(|entry| {
                unit_count += entry.quantity();
                match entry {
                    CartEntry::Resolved { quantity, product } => {
                        let line_total = Decimal::from(*quantity) * product.price.amount;
                        subtotal += line_total;
                        currency = product.price.currency_code;
                        CartLineView {
                            product_id: product.id.as_i32(),
                            title: product.title.clone(),
                            quantity: *quantity,
                            unit_price: product.price.to_string(),
                            line_total: Price::new(line_total, product.price.currency_code)
                                .to_string(),
                            available: true,
                        }
                    }
                    CartEntry::Unresolved {
                        quantity,
                        product_id,
                    } => {
                        all_resolved = false;
                        CartLineView {
                            product_id: product_id.as_i32(),
                            title: "No longer available".to_owned(),
                            quantity: *quantity,
                            unit_price: String::new(),
                            line_total: String::new(),
                            available: false,
                        }
                    }
                }
            })
            .collect();

        Self {
            lines,
            subtotal: Price::new(subtotal, currency).to_string(),
            unit_count,
            ready_for_checkout: all_resolved,
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
    pub quantity: Option<u32>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i32,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub authenticated: bool,
}

/// Resolve the current user's cart into display entries.
async fn resolve_current_cart(
    state: &AppState,
    current: &CurrentUser,
) -> Result<Vec<CartEntry>> {
    let users = UserRepository::new(state.pool());
    let user = users
        .get_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_owned()))?;

    let service = CartService::new(
        UserRepository::new(state.pool()),
        ProductRepository::new(state.pool()),
    );
    Ok(service.resolve_cart(&user.cart).await?)
}

/// Display the cart page.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let entries = resolve_current_cart(&state, &current).await?;

    Ok(CartShowTemplate {
        cart: CartView::from_entries(&entries),
        authenticated: true,
    })
}

/// Add an item to the cart, then bounce back to it.
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    let service = CartService::new(
        UserRepository::new(state.pool()),
        ProductRepository::new(state.pool()),
    );
    service
        .add_item(
            current.id,
            ProductId::new(form.product_id),
            form.quantity.unwrap_or(1),
        )
        .await?;

    Ok(Redirect::to("/cart"))
}

/// Remove an item from the cart, then bounce back to it.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect> {
    let service = CartService::new(
        UserRepository::new(state.pool()),
        ProductRepository::new(state.pool()),
    );
    service
        .remove_item(current.id, ProductId::new(form.product_id))
        .await?;

    Ok(Redirect::to("/cart"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use copperleaf_core::{Product, UserId};

    fn resolved(quantity: u32, price: &str) -> CartEntry {
        let now = Utc::now();
        CartEntry::Resolved {
            quantity,
            product: Product {
                id: ProductId::new(1),
                title: "Widget".to_owned(),
                price: Price::new(price.parse().unwrap(), CurrencyCode::USD),
                description: "desc desc".to_owned(),
                image_url: "images/widget.png".to_owned(),
                owner_id: UserId::new(1),
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[test]
    fn view_totals_lines_at_render_time() {
        let view = CartView::from_entries(&[resolved(3, "10")]);
        assert_eq!(view.lines[0].line_total, "$30.00");
        assert_eq!(view.subtotal, "$30.00");
        assert_eq!(view.unit_count, 3);
        assert!(view.ready_for_checkout);
    }

    #[test]
    fn unresolved_lines_block_checkout_readiness() {
        let entries = [
            resolved(1, "10"),
            CartEntry::Unresolved {
                quantity: 2,
                product_id: ProductId::new(99),
            },
        ];
        let view = CartView::from_entries(&entries);
        assert!(!view.ready_for_checkout);
        assert_eq!(view.unit_count, 3);
        assert!(!view.lines[1].available);
        // Only resolved lines contribute to the subtotal.
        assert_eq!(view.subtotal, "$10.00");
    }

    #[test]
    fn empty_view_is_not_checkout_ready() {
        let view = CartView::from_entries(&[]);
        assert!(!view.ready_for_checkout);
        assert_eq!(view.subtotal, "$0.00");
    }
}
