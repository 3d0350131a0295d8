//! Cart state manager.
//!
//! Wraps the pure [`Cart`] with persistence: the snapshot is hydrated once on
//! construction and written back after every mutation. A corrupt or
//! unreadable snapshot starts an empty cart; a failed write is logged and the
//! in-memory cart stays authoritative.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument, warn};
use youshop_core::{Cart, CartError, CartLine, Money, OrderTotals, Product, ProductId};

use crate::storage::{SharedStore, get_json, keys, set_json};

/// Shared, persisted cart.
#[derive(Clone)]
pub struct CartManager {
    inner: Arc<CartManagerInner>,
}

struct CartManagerInner {
    store: SharedStore,
    cart: Mutex<Cart>,
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("cart", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl CartManager {
    /// Hydrate the cart from `store`.
    #[must_use]
    pub fn load(store: SharedStore) -> Self {
        let cart = match get_json::<Cart>(store.as_ref(), keys::CART) {
            Ok(Some(cart)) => {
                debug!(lines = cart.lines().len(), "Cart restored");
                cart
            }
            Ok(None) => Cart::new(),
            Err(e) => {
                warn!(error = %e, "Stored cart unreadable, starting empty");
                Cart::new()
            }
        };

        Self {
            inner: Arc::new(CartManagerInner {
                store,
                cart: Mutex::new(cart),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.inner
            .cart
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` and persist the result while still holding the lock, so
    /// writes land in mutation order.
    fn mutate<R>(&self, f: impl FnOnce(&mut Cart) -> R) -> R {
        let mut cart = self.lock();
        let result = f(&mut cart);
        if let Err(e) = set_json(self.inner.store.as_ref(), keys::CART, &*cart) {
            warn!(error = %e, "Failed to persist cart");
        }
        result
    }

    /// Add `quantity` of `product`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for `quantity <= 0`; the cart
    /// is unchanged and nothing is written.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_item(&self, product: &Product, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        self.mutate(|cart| cart.add_item(product, quantity))
    }

    /// Remove a product's line. Absent products are ignored.
    #[instrument(skip(self))]
    pub fn remove_item(&self, product_id: &ProductId) {
        self.mutate(|cart| cart.remove_item(product_id));
    }

    /// Set a line's quantity; `quantity <= 0` removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] for quantities beyond `u32`.
    #[instrument(skip(self))]
    pub fn update_quantity(&self, product_id: &ProductId, quantity: i64) -> Result<(), CartError> {
        self.mutate(|cart| cart.update_quantity(product_id, quantity))
            .map(|_| ())
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        self.mutate(Cart::clear);
    }

    /// A copy of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.lock().clone()
    }

    /// Current lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lock().lines().to_vec()
    }

    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lock().subtotal()
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock().item_count()
    }

    #[must_use]
    pub fn totals(&self) -> OrderTotals {
        self.lock().totals()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore, NullStore};

    fn product(id: &str, price: &str) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("Product {id}"),
            "price": price,
            "images": [format!("/img/{id}.png")],
        }))
        .unwrap()
    }

    #[test]
    fn test_reload_reproduces_lines() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let cart = CartManager::load(Arc::clone(&store));
        cart.add_item(&product("p1", "29.99"), 2).unwrap();
        cart.add_item(&product("p2", "15.00"), 1).unwrap();
        cart.update_quantity(&ProductId::new("p1"), 3).unwrap();

        let reloaded = CartManager::load(store);
        assert_eq!(reloaded.snapshot(), cart.snapshot());
        assert_eq!(reloaded.lines()[0].quantity, 3);
        assert_eq!(reloaded.lines()[1].product.image.as_deref(), Some("/img/p2.png"));
    }

    #[test]
    fn test_example_totals() {
        let cart = CartManager::load(Arc::new(MemoryStore::new()));
        cart.add_item(&product("p1", "29.99"), 2).unwrap();
        cart.add_item(&product("p2", "15.00"), 1).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.subtotal, Money::from_str("74.98").unwrap());
        assert_eq!(totals.tax, Money::from_str("5.9984").unwrap());
        assert_eq!(totals.shipping, Money::from_str("9.99").unwrap());
        assert_eq!(totals.total.to_string(), "$90.97");
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_corrupt_snapshot_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::CART, "{{{ definitely not json").unwrap();

        let cart = CartManager::load(store);
        assert!(cart.is_empty());
        cart.add_item(&product("p1", "1"), 1).unwrap();
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_rejected_add_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let cart = CartManager::load(store.clone());

        assert_eq!(
            cart.add_item(&product("p1", "1"), -1),
            Err(CartError::InvalidQuantity(-1))
        );
        assert_eq!(store.get(keys::CART).unwrap(), None);
    }

    #[test]
    fn test_clear_persists_empty_cart() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let cart = CartManager::load(Arc::clone(&store));
        cart.add_item(&product("p1", "1"), 4).unwrap();
        cart.clear();

        assert!(CartManager::load(store).is_empty());
    }

    #[test]
    fn test_works_without_durable_storage() {
        let cart = CartManager::load(Arc::new(NullStore));
        cart.add_item(&product("p1", "2.50"), 2).unwrap();
        cart.remove_item(&ProductId::new("missing"));
        assert_eq!(cart.subtotal(), Money::from_cents(500));
    }
}
