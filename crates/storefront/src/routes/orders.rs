//! Order history and invoice handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

use copperleaf_core::{Order, OrderId};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::services::invoice::Invoice;
use crate::state::AppState;

/// One order line for the history page.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub title: String,
    pub quantity: u32,
    pub unit_price: String,
}

/// One order for the history page.
#[derive(Debug, Clone)]
pub struct OrderSummaryView {
    pub id: i32,
    pub placed_at: String,
    pub total: String,
    pub lines: Vec<OrderLineView>,
}

impl From<&Order> for OrderSummaryView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i32(),
            placed_at: order.placed_at.format("%b %e, %Y").to_string(),
            total: order.grand_total().to_string(),
            lines: order
                .lines
                .iter()
                .map(|line| OrderLineView {
                    title: line.product.title.clone(),
                    quantity: line.quantity,
                    unit_price: line.product.price.to_string(),
                })
                .collect(),
        }
    }
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub orders: Vec<OrderSummaryView>,
    pub authenticated: bool,
}

/// Invoice line display data.
#[derive(Debug, Clone)]
pub struct InvoiceLineView {
    pub title: String,
    pub quantity: u32,
    pub unit_price: String,
    pub total: String,
}

/// Printable invoice document template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/invoice.html")]
pub struct InvoiceTemplate {
    pub order_id: i32,
    pub customer_email: String,
    pub placed_at: String,
    pub lines: Vec<InvoiceLineView>,
    pub grand_total: String,
}

/// Display the signed-in user's order history.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let repo = OrderRepository::new(state.pool());
    let orders = repo.list_for_user(current.id).await?;

    Ok(OrdersIndexTemplate {
        orders: orders.iter().map(OrderSummaryView::from).collect(),
        authenticated: true,
    })
}

/// Render the printable invoice for one order.
///
/// Only the order's owner may see it. Totals are computed from the
/// order's stored snapshots at render time.
pub async fn invoice(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    if order.customer.user_id != current.id {
        return Err(AppError::Unauthorized(
            "you are not allowed to view this order".to_owned(),
        ));
    }

    let invoice = Invoice::from_order(&order);
    let currency = invoice.grand_total.currency_code;

    Ok(InvoiceTemplate {
        order_id: invoice.order_id.as_i32(),
        customer_email: invoice.customer_email,
        placed_at: invoice.placed_at.format("%Y-%m-%d").to_string(),
        lines: invoice
            .lines
            .iter()
            .map(|line| InvoiceLineView {
                title: line.title.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price.to_string(),
                total: copperleaf_core::Price::new(line.total, currency).to_string(),
            })
            .collect(),
        grand_total: invoice.grand_total.to_string(),
    })
}
