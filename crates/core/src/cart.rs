//! The in-progress order.
//!
//! [`Cart`] keeps two invariants no matter which operations are applied:
//! each product appears on at most one line, and every stored quantity is at
//! least 1. Persistence lives in the storefront crate; this type is pure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::OrderTotals;
use crate::types::{CategoryId, Money, Product, ProductId};

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity passed to `add_item` was zero or negative.
    #[error("quantity must be a positive integer (got {0})")]
    InvalidQuantity(i64),

    /// The resulting line quantity does not fit the line counter.
    #[error("quantity for product {product_id} is too large")]
    QuantityOverflow {
        /// Product whose line would overflow.
        product_id: ProductId,
    },
}

/// Product details captured when a line is created, for display without a
/// catalog round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            image: Some(product.primary_image().to_string()),
            sku: product.sku.clone(),
            category_id: product.category_id().cloned(),
        }
    }
}

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    /// Price at the moment the product was first added.
    pub unit_price: Money,
    pub quantity: u32,
    pub product: ProductSnapshot,
}

impl CartLine {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Ordered cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` of a product.
    ///
    /// Increments the existing line when the product is already in the cart,
    /// otherwise appends a new line with the product's current price.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `quantity <= 0` (the cart is
    /// left unchanged) and [`CartError::QuantityOverflow`] if the line would
    /// exceed `u32::MAX`.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let overflow = || CartError::QuantityOverflow {
            product_id: product.id.clone(),
        };
        let quantity = u32::try_from(quantity).map_err(|_| overflow())?;

        if let Some(line) = self.line_mut(&product.id) {
            line.quantity = line.quantity.checked_add(quantity).ok_or_else(overflow)?;
            return Ok(());
        }

        self.lines.push(CartLine {
            product_id: product.id.clone(),
            unit_price: product.price,
            quantity,
            product: ProductSnapshot::from(product),
        });
        Ok(())
    }

    /// Remove a product's line. Returns true if a line was removed.
    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| &line.product_id != product_id);
        self.lines.len() < before
    }

    /// Replace a line's quantity.
    ///
    /// A quantity of zero or less removes the line. Updating a product that is
    /// not in the cart does nothing. Returns true if the cart changed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if `quantity` exceeds `u32::MAX`.
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<bool, CartError> {
        if quantity <= 0 {
            return Ok(self.remove_item(product_id));
        }
        let quantity = u32::try_from(quantity).map_err(|_| CartError::QuantityOverflow {
            product_id: product_id.clone(),
        })?;

        Ok(self.line_mut(product_id).is_some_and(|line| {
            let changed = line.quantity != quantity;
            line.quantity = quantity;
            changed
        }))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The line for a product, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| &line.product_id == product_id)
    }

    /// Σ `unit_price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Σ quantity.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Subtotal, tax, shipping and total for the current lines.
    #[must_use]
    pub fn totals(&self) -> OrderTotals {
        OrderTotals::for_lines(&self.lines)
    }

    /// Returns true if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<Vec<CartLine>> for Cart {
    /// Build a cart from untrusted lines (e.g. a persisted snapshot).
    ///
    /// Zero-quantity lines are dropped and duplicate products are merged into
    /// the first occurrence, so the invariants hold for whatever was stored.
    fn from(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match cart.line_mut(&line.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;

    fn product(id: &str, price: &str) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("Product {id}"),
            "price": price,
        }))
        .expect("valid product")
    }

    fn money(s: &str) -> Money {
        s.parse().expect("valid decimal")
    }

    #[test]
    fn test_add_new_product_creates_one_line() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", "29.99"), 3).expect("add");

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.lines()[0].unit_price, money("29.99"));
    }

    #[test]
    fn test_add_existing_product_increments() {
        let mut cart = Cart::new();
        let p1 = product("p1", "29.99");
        cart.add_item(&p1, 2).expect("add");
        cart.add_item(&p1, 5).expect("add again");

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 7);
    }

    #[test]
    fn test_add_keeps_first_price_snapshot() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", "10"), 1).expect("add");
        cart.add_item(&product("p1", "12"), 1).expect("add repriced");

        assert_eq!(cart.lines()[0].unit_price, money("10"));
        assert_eq!(cart.subtotal(), money("20"));
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = Cart::new();
        let p1 = product("p1", "1");

        assert_eq!(cart.add_item(&p1, 0), Err(CartError::InvalidQuantity(0)));
        assert_eq!(cart.add_item(&p1, -3), Err(CartError::InvalidQuantity(-3)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_overflow_leaves_line_untouched() {
        let mut cart = Cart::new();
        let p1 = product("p1", "1");
        cart.add_item(&p1, i64::from(u32::MAX)).expect("add max");

        assert!(matches!(
            cart.add_item(&p1, 1),
            Err(CartError::QuantityOverflow { .. })
        ));
        assert_eq!(cart.lines()[0].quantity, u32::MAX);
    }

    #[test]
    fn test_update_to_zero_or_negative_removes() {
        for quantity in [0, -5] {
            let mut cart = Cart::new();
            cart.add_item(&product("p1", "1"), 2).expect("add");
            cart.add_item(&product("p2", "1"), 2).expect("add");

            assert_eq!(
                cart.update_quantity(&ProductId::new("p1"), quantity),
                Ok(true)
            );
            assert!(cart.line(&ProductId::new("p1")).is_none());
            assert_eq!(cart.lines().len(), 1);
        }
    }

    #[test]
    fn test_update_replaces_quantity() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", "1"), 2).expect("add");

        assert_eq!(cart.update_quantity(&ProductId::new("p1"), 9), Ok(true));
        assert_eq!(cart.lines()[0].quantity, 9);
        assert_eq!(cart.update_quantity(&ProductId::new("p1"), 9), Ok(false));
    }

    #[test]
    fn test_update_absent_product_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", "1"), 2).expect("add");
        let before = cart.clone();

        assert_eq!(cart.update_quantity(&ProductId::new("zz"), 4), Ok(false));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", "1"), 2).expect("add");
        let before = cart.clone();

        assert!(!cart.remove_item(&ProductId::new("missing")));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_example_scenario_totals() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", "29.99"), 2).expect("add");
        cart.add_item(&product("p2", "15.00"), 1).expect("add");

        let totals = cart.totals();
        assert_eq!(totals.subtotal, money("74.98"));
        assert_eq!(totals.tax, money("5.9984"));
        assert_eq!(totals.shipping, money("9.99"));
        assert_eq!(totals.total.rounded(), money("90.97"));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_deserialize_sanitizes_snapshot() {
        let json = r#"[
            {"productId":"p1","unitPrice":2,"quantity":1,"product":{"name":"A"}},
            {"productId":"p2","unitPrice":3,"quantity":0,"product":{"name":"B"}},
            {"productId":"p1","unitPrice":2,"quantity":4,"product":{"name":"A"}}
        ]"#;
        let cart: Cart = serde_json::from_str(json).expect("deserialize");

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8, i64),
        Update(u8, i64),
        Remove(u8),
        Clear,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            6 => (0u8..6, 1i64..20).prop_map(|(p, q)| Op::Add(p, q)),
            3 => (0u8..6, -5i64..20).prop_map(|(p, q)| Op::Update(p, q)),
            2 => (0u8..6).prop_map(Op::Remove),
            1 => Just(Op::Clear),
        ]
    }

    fn price_of(index: u8) -> Money {
        Money::from_cents(i64::from(index) * 137 + 99)
    }

    proptest! {
        /// Property: after every operation the cart matches a simple model and
        /// the subtotal equals Σ unit price × quantity exactly.
        #[test]
        fn prop_cart_invariants_hold(ops in prop::collection::vec(op_strategy(), 0..60)) {
            let mut cart = Cart::new();
            let mut model: HashMap<u8, u32> = HashMap::new();

            for op in ops {
                match op {
                    Op::Add(p, q) => {
                        let mut item = product(&format!("p{p}"), "0");
                        item.price = price_of(p);
                        cart.add_item(&item, q).expect("positive add");
                        *model.entry(p).or_insert(0) += u32::try_from(q).expect("small");
                    }
                    Op::Update(p, q) => {
                        cart.update_quantity(&ProductId::new(format!("p{p}")), q).expect("update");
                        if q <= 0 {
                            model.remove(&p);
                        } else if let Some(existing) = model.get_mut(&p) {
                            *existing = u32::try_from(q).expect("small");
                        }
                    }
                    Op::Remove(p) => {
                        cart.remove_item(&ProductId::new(format!("p{p}")));
                        model.remove(&p);
                    }
                    Op::Clear => {
                        cart.clear();
                        model.clear();
                    }
                }

                prop_assert_eq!(cart.lines().len(), model.len());
                for line in cart.lines() {
                    prop_assert!(line.quantity >= 1);
                    let duplicates = cart
                        .lines()
                        .iter()
                        .filter(|other| other.product_id == line.product_id)
                        .count();
                    prop_assert_eq!(duplicates, 1);
                }

                let expected: Money = model
                    .iter()
                    .map(|(p, q)| price_of(*p) * *q)
                    .sum();
                prop_assert_eq!(cart.subtotal(), expected);
                prop_assert_eq!(
                    cart.item_count(),
                    model.values().map(|q| u64::from(*q)).sum::<u64>()
                );
            }
        }

        /// Property: a serialized cart reloads to the identical line sequence.
        #[test]
        fn prop_snapshot_reload_is_identical(ops in prop::collection::vec(op_strategy(), 0..30)) {
            let mut cart = Cart::new();
            for op in ops {
                if let Op::Add(p, q) = op {
                    let mut item = product(&format!("p{p}"), "0");
                    item.price = price_of(p);
                    cart.add_item(&item, q).expect("positive add");
                }
            }

            let json = serde_json::to_string(&cart).expect("serialize");
            let reloaded: Cart = serde_json::from_str(&json).expect("deserialize");
            prop_assert_eq!(reloaded, cart);
        }
    }
}
