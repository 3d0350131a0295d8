//! Order pricing rules.
//!
//! These are the only place the tax rate and shipping rules live. The cart
//! summary, the checkout summary and order creation all go through
//! [`OrderTotals`], and totals are always recomputed from the current lines
//! rather than cached.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::types::Money;

/// Sales tax applied to the subtotal (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Subtotals strictly above this amount ship for free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::new(Decimal::from_parts(100, 0, 0, false, 0));

/// Flat shipping fee charged at or below the free-shipping threshold.
pub const FLAT_SHIPPING_FEE: Money = Money::new(Decimal::from_parts(999, 0, 0, false, 2));

/// Tax owed on a subtotal. Exact, not rounded.
#[must_use]
pub fn tax_for(subtotal: Money) -> Money {
    subtotal * TAX_RATE
}

/// Shipping owed on a subtotal.
///
/// A subtotal of exactly 100.00 still pays the flat fee.
#[must_use]
pub fn shipping_for(subtotal: Money) -> Money {
    if subtotal > FREE_SHIPPING_THRESHOLD {
        Money::ZERO
    } else {
        FLAT_SHIPPING_FEE
    }
}

/// Derived amounts for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Compute totals from a subtotal.
    #[must_use]
    pub fn from_subtotal(subtotal: Money) -> Self {
        let tax = tax_for(subtotal);
        let shipping = shipping_for(subtotal);
        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }

    /// Compute totals for cart lines.
    #[must_use]
    pub fn for_lines(lines: &[CartLine]) -> Self {
        Self::from_subtotal(lines.iter().map(CartLine::line_total).sum())
    }

    /// Returns true if shipping is free for these totals.
    #[must_use]
    pub fn ships_free(&self) -> bool {
        self.shipping.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        s.parse().expect("valid decimal")
    }

    #[test]
    fn test_example_cart_totals() {
        // 29.99 x 2 + 15.00 x 1
        let totals = OrderTotals::from_subtotal(money("74.98"));

        assert_eq!(totals.tax, money("5.9984"));
        assert_eq!(totals.shipping, money("9.99"));
        assert_eq!(totals.total, money("90.9684"));
        assert_eq!(totals.tax.to_string(), "$6.00");
        assert_eq!(totals.total.to_string(), "$90.97");
    }

    #[test]
    fn test_shipping_boundary_is_exclusive() {
        assert_eq!(shipping_for(money("100.00")), money("9.99"));
        assert_eq!(shipping_for(money("100.01")), Money::ZERO);
        assert_eq!(shipping_for(money("99.99")), money("9.99"));
    }

    #[test]
    fn test_free_shipping_totals() {
        let totals = OrderTotals::from_subtotal(money("150"));
        assert!(totals.ships_free());
        assert_eq!(totals.tax, money("12"));
        assert_eq!(totals.total, money("162"));
    }

    #[test]
    fn test_empty_subtotal_still_charges_shipping() {
        let totals = OrderTotals::from_subtotal(Money::ZERO);
        assert_eq!(totals.total, FLAT_SHIPPING_FEE);
    }
}
