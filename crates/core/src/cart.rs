//! Per-user cart state and its pure transformations.
//!
//! A [`Cart`] is the pre-purchase mapping of product to desired quantity,
//! embedded in the owning user's record. All operations here are pure:
//! they consume the old value and return a new one. Writing the result
//! back to the user record is the caller's explicit, separate step, which
//! keeps the persistence boundary (and its concurrency control) visible.

use serde::{Deserialize, Serialize};

use crate::product::Product;
use crate::types::ProductId;

/// A single cart line: a product reference and a desired quantity.
///
/// A cart holds at most one item per distinct [`ProductId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// The referenced product.
    pub product_id: ProductId,
    /// Desired quantity. Always at least 1.
    pub quantity: u32,
}

/// A user's cart.
///
/// Serialized as `{"items": [...]}` into the user record; the wrapper
/// struct keeps that document shape stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from existing items.
    ///
    /// Later duplicates of a `ProductId` are merged into the first
    /// occurrence so the one-item-per-product invariant holds for any
    /// input.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        items
            .into_iter()
            .fold(Self::empty(), |cart, item| match item.quantity {
                0 => cart,
                quantity => {
                    if cart.contains(item.product_id) {
                        cart.add(item.product_id, quantity)
                    } else {
                        // First occurrence keeps its own quantity.
                        let mut items = cart.items;
                        items.push(item);
                        Self { items }
                    }
                }
            })
    }

    /// The cart lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total unit count across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Whether the cart contains the given product.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.quantity_of(product_id).is_some()
    }

    /// The quantity for a product, if present.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map(|item| item.quantity)
    }

    /// Add a product to the cart, merging on an existing line.
    ///
    /// If the product is already in the cart, its quantity is incremented
    /// by `quantity`. A product not yet in the cart is appended with
    /// quantity 1, regardless of the requested quantity: first-add always
    /// lands a single unit, and repeat adds accumulate.
    ///
    /// `quantity` must be at least 1; callers validate before calling.
    #[must_use]
    pub fn add(self, product_id: ProductId, quantity: u32) -> Self {
        let mut items = self.items;
        match items.iter_mut().find(|item| item.product_id == product_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => items.push(CartItem {
                product_id,
                quantity: 1,
            }),
        }
        Self { items }
    }

    /// Remove a product from the cart.
    ///
    /// Keeps every line whose product does not match. Removing a product
    /// that is not in the cart is a no-op, not an error.
    #[must_use]
    pub fn remove(self, product_id: ProductId) -> Self {
        let mut items = self.items;
        items.retain(|item| item.product_id != product_id);
        Self { items }
    }

    /// Discard all items unconditionally.
    #[must_use]
    pub fn clear(self) -> Self {
        Self::empty()
    }

    /// Resolve each line against the catalog.
    ///
    /// `lookup` returns the product for an id if it still exists. Lines
    /// whose product has since been deleted come back as
    /// [`CartEntry::Unresolved`]; dangling references are tolerated in
    /// cart state and surfaced only here, at read time.
    #[must_use]
    pub fn resolve<'a, F>(&self, lookup: F) -> Vec<CartEntry>
    where
        F: Fn(ProductId) -> Option<&'a Product>,
    {
        self.items
            .iter()
            .map(|item| match lookup(item.product_id) {
                Some(product) => CartEntry::Resolved {
                    quantity: item.quantity,
                    product: product.clone(),
                },
                None => CartEntry::Unresolved {
                    quantity: item.quantity,
                    product_id: item.product_id,
                },
            })
            .collect()
    }
}

/// A cart line joined against the catalog.
///
/// Resolution state is explicit in the type: a line either carries the
/// full product data or just the id of a product that no longer exists.
#[derive(Debug, Clone, PartialEq)]
pub enum CartEntry {
    /// The referenced product exists; its data is attached.
    Resolved {
        /// Desired quantity.
        quantity: u32,
        /// The product at resolution time.
        product: Product,
    },
    /// The referenced product could not be found.
    Unresolved {
        /// Desired quantity.
        quantity: u32,
        /// The dangling reference.
        product_id: ProductId,
    },
}

impl CartEntry {
    /// Desired quantity for this line.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        match self {
            Self::Resolved { quantity, .. } | Self::Unresolved { quantity, .. } => *quantity,
        }
    }

    /// The referenced product id.
    #[must_use]
    pub fn product_id(&self) -> ProductId {
        match self {
            Self::Resolved { product, .. } => product.id,
            Self::Unresolved { product_id, .. } => *product_id,
        }
    }

    /// The resolved product, if this line resolved.
    #[must_use]
    pub const fn product(&self) -> Option<&Product> {
        match self {
            Self::Resolved { product, .. } => Some(product),
            Self::Unresolved { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{CurrencyCode, Price, UserId};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn product(id: i32, title: &str, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            title: title.to_owned(),
            price: Price::new(Decimal::from(price), CurrencyCode::USD),
            description: format!("{title} description"),
            image_url: format!("images/{id}.png"),
            owner_id: UserId::new(1),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn add_of_absent_product_appends_single_unit() {
        let cart = Cart::empty().add(ProductId::new(1), 5);
        assert_eq!(cart.len(), 1);
        // First-add pins quantity to 1 even when more was requested.
        assert_eq!(cart.quantity_of(ProductId::new(1)), Some(1));
    }

    #[test]
    fn add_of_present_product_increments_quantity() {
        let cart = Cart::empty()
            .add(ProductId::new(1), 1)
            .add(ProductId::new(1), 1);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(ProductId::new(1)), Some(2));

        let cart = cart.add(ProductId::new(1), 3);
        assert_eq!(cart.quantity_of(ProductId::new(1)), Some(5));
    }

    #[test]
    fn add_never_produces_duplicate_lines() {
        let mut cart = Cart::empty();
        for _ in 0..10 {
            cart = cart.add(ProductId::new(7), 1);
        }
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(ProductId::new(7)), Some(10));
    }

    #[test]
    fn remove_filters_on_exact_id() {
        let cart = Cart::empty()
            .add(ProductId::new(1), 1)
            .add(ProductId::new(2), 1)
            .remove(ProductId::new(1));
        assert_eq!(cart.len(), 1);
        assert!(!cart.contains(ProductId::new(1)));
        assert!(cart.contains(ProductId::new(2)));
    }

    #[test]
    fn remove_of_absent_product_is_a_no_op() {
        let cart = Cart::empty().add(ProductId::new(1), 1);
        let after = cart.clone().remove(ProductId::new(99));
        assert_eq!(after, cart);
    }

    #[test]
    fn clear_always_empties() {
        assert!(Cart::empty().clear().is_empty());

        let cart = Cart::empty()
            .add(ProductId::new(1), 1)
            .add(ProductId::new(2), 1)
            .clear();
        assert!(cart.is_empty());
        assert_eq!(cart, Cart::empty());
    }

    #[test]
    fn unit_count_sums_quantities() {
        let cart = Cart::empty()
            .add(ProductId::new(1), 1)
            .add(ProductId::new(1), 2)
            .add(ProductId::new(2), 1);
        assert_eq!(cart.unit_count(), 4);
    }

    #[test]
    fn from_items_merges_duplicates_and_drops_zeroes() {
        let cart = Cart::from_items([
            CartItem {
                product_id: ProductId::new(1),
                quantity: 2,
            },
            CartItem {
                product_id: ProductId::new(2),
                quantity: 0,
            },
            CartItem {
                product_id: ProductId::new(1),
                quantity: 3,
            },
        ]);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(ProductId::new(1)), Some(5));
    }

    #[test]
    fn resolve_tags_missing_products() {
        let widget = product(1, "Widget", 10);
        let cart = Cart::empty()
            .add(ProductId::new(1), 1)
            .add(ProductId::new(2), 1);

        let entries = cart.resolve(|id| (id == widget.id).then_some(&widget));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].product().map(|p| p.title.as_str()), Some("Widget"));
        assert_eq!(
            entries[1],
            CartEntry::Unresolved {
                quantity: 1,
                product_id: ProductId::new(2),
            }
        );
    }

    #[test]
    fn cart_document_shape_round_trips() {
        let cart = Cart::empty().add(ProductId::new(3), 1).add(ProductId::new(3), 1);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"items": [{"product_id": 3, "quantity": 2}]})
        );
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
