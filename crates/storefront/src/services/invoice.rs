//! Invoice computation over a materialized order.
//!
//! Pure presentation math: every amount here derives from the order's
//! stored snapshots (`quantity * unit price` per line), so an invoice for
//! an old order is identical no matter what happened to the catalog
//! since. Rendering to a printable document happens in the orders route;
//! this module only produces the numbers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use copperleaf_core::{Order, OrderId, Price};

/// One line of an invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLine {
    /// Product title at purchase time.
    pub title: String,
    /// Units purchased.
    pub quantity: u32,
    /// Unit price at purchase time.
    pub unit_price: Price,
    /// `quantity * unit_price`.
    pub total: Decimal,
}

/// A computed invoice for one order.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    /// The order this invoice covers.
    pub order_id: OrderId,
    /// Billing address line (the customer's email).
    pub customer_email: String,
    /// When the order was placed.
    pub placed_at: DateTime<Utc>,
    /// Invoice lines, in order.
    pub lines: Vec<InvoiceLine>,
    /// Grand total across all lines.
    pub grand_total: Price,
}

impl Invoice {
    /// Compute the invoice for an order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        let lines = order
            .lines
            .iter()
            .map(|line| InvoiceLine {
                title: line.product.title.clone(),
                quantity: line.quantity,
                unit_price: line.product.price,
                total: line.total(),
            })
            .collect();

        Self {
            order_id: order.id,
            customer_email: order.customer.email.to_string(),
            placed_at: order.placed_at,
            lines,
            grand_total: order.grand_total(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use copperleaf_core::{
        CurrencyCode, Email, OrderCustomer, OrderLine, ProductId, ProductSnapshot, UserId,
    };

    fn snapshot(id: i32, title: &str, price: &str) -> ProductSnapshot {
        ProductSnapshot {
            product_id: ProductId::new(id),
            title: title.to_owned(),
            price: Price::new(price.parse().unwrap(), CurrencyCode::USD),
            description: format!("{title} description"),
            image_url: format!("images/{id}.png"),
            owner_id: UserId::new(1),
        }
    }

    fn order(lines: Vec<OrderLine>) -> Order {
        Order {
            id: OrderId::new(41),
            customer: OrderCustomer {
                user_id: UserId::new(9),
                email: Email::parse("buyer@example.com").unwrap(),
            },
            lines,
            placed_at: Utc::now(),
        }
    }

    #[test]
    fn widget_times_three_totals_thirty() {
        let invoice = Invoice::from_order(&order(vec![OrderLine {
            quantity: 3,
            product: snapshot(1, "Widget", "10"),
        }]));

        assert_eq!(invoice.lines.len(), 1);
        assert_eq!(invoice.lines[0].total, Decimal::from(30));
        assert_eq!(invoice.grand_total.amount, Decimal::from(30));
        assert_eq!(invoice.customer_email, "buyer@example.com");
    }

    #[test]
    fn grand_total_sums_every_line() {
        let invoice = Invoice::from_order(&order(vec![
            OrderLine {
                quantity: 2,
                product: snapshot(1, "Widget", "19.99"),
            },
            OrderLine {
                quantity: 1,
                product: snapshot(2, "Gadget", "0.01"),
            },
        ]));

        assert_eq!(
            invoice.grand_total.amount,
            "39.99".parse::<Decimal>().unwrap()
        );
    }

    #[test]
    fn empty_orders_produce_a_zero_invoice() {
        let invoice = Invoice::from_order(&order(Vec::new()));
        assert!(invoice.lines.is_empty());
        assert_eq!(invoice.grand_total.amount, Decimal::ZERO);
    }
}
