//! Immutable order records with denormalized product snapshots.
//!
//! An [`Order`] is the durable result of materializing a cart: every line
//! carries a full copy of the product's fields as they were at purchase
//! time, so later catalog edits or deletions never change what a customer
//! bought. Orders are created once and never mutated.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::product::Product;
use crate::types::{CurrencyCode, Email, OrderId, Price, ProductId, UserId};

/// A point-in-time copy of a product's fields.
///
/// This is the snapshot the glossary talks about: stored independently of
/// the catalog row so later changes to the source do not propagate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// The catalog product this was copied from.
    pub product_id: ProductId,
    /// Title at purchase time.
    pub title: String,
    /// Unit price at purchase time.
    pub price: Price,
    /// Description at purchase time.
    pub description: String,
    /// Image reference at purchase time.
    pub image_url: String,
    /// The user who listed the product.
    pub owner_id: UserId,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            title: product.title.clone(),
            price: product.price,
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            owner_id: product.owner_id,
        }
    }
}

/// One purchased line: a quantity and the product snapshot it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Units purchased. Always at least 1.
    pub quantity: u32,
    /// The product as it was at purchase time.
    pub product: ProductSnapshot,
}

impl OrderLine {
    /// The line total, `quantity * unit price`.
    ///
    /// Derived on demand; totals are never stored on the order.
    #[must_use]
    pub fn total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.product.price.amount
    }
}

/// The customer an order belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    /// The owning user.
    pub user_id: UserId,
    /// The user's address at purchase time, for display on invoices.
    pub email: Email,
}

/// An order ready to be persisted.
///
/// The id and timestamp are assigned by the store on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    /// The purchasing customer.
    pub customer: OrderCustomer,
    /// Purchased lines, in cart order.
    pub lines: Vec<OrderLine>,
}

impl NewOrder {
    /// Grand total across all lines.
    #[must_use]
    pub fn grand_total(&self) -> Price {
        grand_total(&self.lines)
    }
}

/// An immutable record of a completed purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// The purchasing customer.
    pub customer: OrderCustomer,
    /// Purchased lines, in cart order.
    pub lines: Vec<OrderLine>,
    /// When the order was placed.
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// Grand total across all lines, `sum(quantity * unit price)`.
    #[must_use]
    pub fn grand_total(&self) -> Price {
        grand_total(&self.lines)
    }

    /// Total units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

fn grand_total(lines: &[OrderLine]) -> Price {
    let currency = lines
        .first()
        .map_or(CurrencyCode::default(), |line| {
            line.product.price.currency_code
        });
    let amount = lines.iter().map(OrderLine::total).sum();
    Price::new(amount, currency)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product(id: i32, title: &str, price: &str) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            title: title.to_owned(),
            price: Price::new(price.parse().unwrap(), CurrencyCode::USD),
            description: format!("{title} description"),
            image_url: format!("images/{id}.png"),
            owner_id: UserId::new(1),
            created_at: now,
            updated_at: now,
        }
    }

    fn customer() -> OrderCustomer {
        OrderCustomer {
            user_id: UserId::new(9),
            email: Email::parse("buyer@example.com").unwrap(),
        }
    }

    #[test]
    fn snapshot_copies_every_product_field() {
        let source = product(1, "Widget", "10");
        let snapshot = ProductSnapshot::from(&source);

        assert_eq!(snapshot.product_id, source.id);
        assert_eq!(snapshot.title, source.title);
        assert_eq!(snapshot.price, source.price);
        assert_eq!(snapshot.description, source.description);
        assert_eq!(snapshot.image_url, source.image_url);
        assert_eq!(snapshot.owner_id, source.owner_id);
    }

    #[test]
    fn snapshot_is_insulated_from_later_product_changes() {
        let mut source = product(1, "Widget", "10");
        let snapshot = ProductSnapshot::from(&source);

        source.price = Price::new("99.99".parse().unwrap(), CurrencyCode::USD);
        source.title = "Renamed Widget".to_owned();

        assert_eq!(snapshot.title, "Widget");
        assert_eq!(snapshot.price.amount, Decimal::from(10));
    }

    #[test]
    fn line_and_grand_totals_derive_from_snapshots() {
        // cart = [{P1, qty 3}], P1 = {title: "Widget", price: 10}
        let line = OrderLine {
            quantity: 3,
            product: ProductSnapshot::from(&product(1, "Widget", "10")),
        };
        assert_eq!(line.total(), Decimal::from(30));

        let order = NewOrder {
            customer: customer(),
            lines: vec![
                line,
                OrderLine {
                    quantity: 1,
                    product: ProductSnapshot::from(&product(2, "Gadget", "2.50")),
                },
            ],
        };
        assert_eq!(order.grand_total().amount, "32.50".parse::<Decimal>().unwrap());
        assert_eq!(order.grand_total().currency_code, CurrencyCode::USD);
    }

    #[test]
    fn empty_order_totals_to_zero() {
        let order = NewOrder {
            customer: customer(),
            lines: Vec::new(),
        };
        assert_eq!(order.grand_total().amount, Decimal::ZERO);
    }

    #[test]
    fn order_lines_serialize_with_embedded_snapshots() {
        let order = Order {
            id: OrderId::new(5),
            customer: customer(),
            lines: vec![OrderLine {
                quantity: 2,
                product: ProductSnapshot::from(&product(1, "Widget", "10")),
            }],
            placed_at: Utc::now(),
        };

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["lines"][0]["quantity"], 2);
        assert_eq!(json["lines"][0]["product"]["title"], "Widget");

        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
