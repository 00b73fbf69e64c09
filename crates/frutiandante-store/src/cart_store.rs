//! # Persistent Cart
//!
//! Wraps the pure [`Cart`] and writes it to [`LocalStorage`] after every
//! change, so a reload or a new session picks up where the customer left.
//!
//! ## Storage Format
//! The value is a JSON array of cart lines:
//! ```json
//! [{"productId":"p1","name":"Palta","unitPrice":3990,"saleUnit":"kilogram",
//!   "quantity":1.5,"addedAt":"2024-05-01T12:00:00Z"}]
//! ```
//! A value that cannot be parsed yields an empty cart. Storage errors are
//! logged and never abort a cart operation.

use std::sync::Arc;

use tracing::{debug, warn};

use frutiandante_core::cart::{Cart, CartItem, CartRules, CartSummary, LoyaltyStatus};
use frutiandante_core::{CoreResult, DiscountRate, Product, Quantity, SiteConfig};

use crate::storage::LocalStorage;

/// Default storage key of the cart value.
pub const DEFAULT_CART_KEY: &str = "frutiandante-cart";

pub struct PersistentCart {
    cart: Cart,
    rules: CartRules,
    storage: Arc<dyn LocalStorage>,
    key: String,
}

impl PersistentCart {
    /// Rehydrates the cart stored under `key`.
    pub fn load(storage: Arc<dyn LocalStorage>, key: impl Into<String>, rules: CartRules) -> Self {
        let key = key.into();
        let cart = match storage.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<CartItem>>(&raw) {
                Ok(items) => restore(&key, items, &rules),
                Err(e) => {
                    warn!(key = %key, error = %e, "Stored cart is corrupt, starting empty");
                    Cart::new()
                }
            },
            Ok(None) => Cart::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "Could not read stored cart, starting empty");
                Cart::new()
            }
        };

        PersistentCart {
            cart,
            rules,
            storage,
            key,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn rules(&self) -> &CartRules {
        &self.rules
    }

    /// Replaces the quantity rules (e.g. after the site settings change).
    /// Lines the new rules reject are removed.
    pub fn set_rules(&mut self, rules: CartRules) {
        if rules == self.rules {
            return;
        }
        self.rules = rules;

        let before = self.cart.line_count();
        let items = self.cart.items().to_vec();
        self.cart = restore(&self.key, items, &self.rules);
        if self.cart.line_count() != before {
            self.persist();
        }
    }

    /// Follows the weight step of the current site settings.
    pub fn apply_settings(&mut self, settings: &SiteConfig) {
        self.set_rules(CartRules::with_weight_step(settings.weight_step));
    }

    pub fn add(&mut self, product: &Product, quantity: Quantity) -> CoreResult<()> {
        self.cart.add_item(product, quantity, &self.rules)?;
        self.persist();
        Ok(())
    }

    pub fn remove(&mut self, product_id: &str) -> bool {
        let changed = self.cart.remove_item(product_id);
        if changed {
            self.persist();
        }
        changed
    }

    pub fn update_quantity(&mut self, product_id: &str, quantity: Quantity) -> bool {
        let changed = self.cart.update_quantity(product_id, quantity, &self.rules);
        if changed {
            self.persist();
        }
        changed
    }

    pub fn increment(&mut self, product_id: &str) -> bool {
        let changed = self.cart.increment(product_id, &self.rules);
        if changed {
            self.persist();
        }
        changed
    }

    pub fn decrement(&mut self, product_id: &str) -> bool {
        let changed = self.cart.decrement(product_id, &self.rules);
        if changed {
            self.persist();
        }
        changed
    }

    pub fn clear(&mut self) {
        self.cart.clear();
        self.persist();
    }

    pub fn summary(&self, loyalty: LoyaltyStatus, rate: DiscountRate) -> CartSummary {
        CartSummary::compute(&self.cart, loyalty, rate)
    }

    fn persist(&self) {
        let raw = match serde_json::to_string(self.cart.items()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Could not serialize cart");
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.key, &raw) {
            warn!(key = %self.key, error = %e, "Could not save cart");
        }
    }
}

/// Builds a cart from stored lines, dropping the ones `rules` reject.
/// A value that cannot form a valid cart at all yields an empty cart.
fn restore(key: &str, items: Vec<CartItem>, rules: &CartRules) -> Cart {
    match Cart::from_items(items, rules) {
        Ok((cart, rejected)) => {
            for item in &rejected {
                warn!(
                    key = %key,
                    product_id = %item.product_id,
                    quantity = %item.quantity,
                    "Dropping stored cart line outside the quantity rules"
                );
            }
            debug!(key = %key, lines = cart.line_count(), "Cart restored");
            cart
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Stored cart is corrupt, starting empty");
            Cart::new()
        }
    }
}
