//! # Cart
//!
//! The shopping cart and its totals, including the loyalty discount.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Storefront Action        Operation               Cart Change           │
//! │  ─────────────────        ─────────               ───────────           │
//! │                                                                         │
//! │  "Agregar" ──────────────► add_item() ──────────► merge or push line    │
//! │                                                                         │
//! │  + / − buttons ──────────► increment() ─────────► qty += step          │
//! │                            decrement() ─────────► qty -= step,          │
//! │                                                   line removed < step   │
//! │                                                                         │
//! │  Quantity input ─────────► update_quantity() ───► qty = n (or no-op)   │
//! │                                                                         │
//! │  Trash icon ─────────────► remove_item() ───────► line removed         │
//! │                                                                         │
//! │  Empty cart ─────────────► clear() ─────────────► no lines             │
//! │                                                                         │
//! │  Cart drawer ────────────► CartSummary::compute() (read only)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence to local storage lives in `frutiandante-store`; everything
//! here is pure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{DiscountRate, Product, SaleUnit};
use crate::validation::validate_cart_size;
use crate::{DEFAULT_WEIGHT_STEP, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Rules
// =============================================================================

/// Quantity limits applied by every cart operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartRules {
    /// Minimum step for kilogram goods (e.g. 0.5 kg).
    pub weight_step: Quantity,
    /// Largest quantity a single line may hold.
    pub max_quantity: Quantity,
}

impl Default for CartRules {
    fn default() -> Self {
        CartRules {
            weight_step: DEFAULT_WEIGHT_STEP,
            max_quantity: MAX_ITEM_QUANTITY,
        }
    }
}

impl CartRules {
    /// Builds rules with a custom kilogram step.
    pub fn with_weight_step(weight_step: Quantity) -> Self {
        CartRules {
            weight_step,
            ..Self::default()
        }
    }

    /// Minimum step for a sale unit: one whole item, or the weight step.
    pub fn step_for(&self, unit: SaleUnit) -> Quantity {
        match unit {
            SaleUnit::Unit => Quantity::from_whole(1),
            SaleUnit::Kilogram => self.weight_step,
        }
    }

    /// Checks a quantity for a line of the given unit.
    fn check(&self, unit: SaleUnit, quantity: Quantity) -> CoreResult<()> {
        let step = self.step_for(unit);
        if quantity < step {
            return Err(CoreError::BelowStep {
                requested: quantity,
                step,
            });
        }
        if unit == SaleUnit::Unit && !quantity.is_whole() {
            return Err(CoreError::FractionalUnits(quantity));
        }
        if quantity > self.max_quantity {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: self.max_quantity,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// A line in the cart.
///
/// ## Design Notes
/// Display fields and the unit price are copied from the product when the
/// line is created, so the cart keeps showing what the buyer chose even if
/// the product document changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Price per unit (or per kilogram) at the time of adding.
    pub unit_price: Money,
    #[serde(default)]
    pub sale_unit: SaleUnit,
    #[ts(type = "number")]
    pub quantity: Quantity,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a cart line from a product and quantity.
    pub fn from_product(product: &Product, quantity: Quantity) -> Self {
        CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            unit_price: product.price,
            sale_unit: product.sale_unit,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Unit price × quantity, rounded half-up to the peso.
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product merges)
/// - Every line holds at least its minimum step
/// - At most `MAX_CART_ITEMS` lines
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { items: Vec::new() }
    }

    /// Builds a cart from persisted lines.
    ///
    /// Duplicate lines are merged so product ids stay unique. Merged lines
    /// the rules would not accept (below the step, fractional units, above
    /// the maximum) are left out and returned alongside the cart.
    ///
    /// ## Errors
    /// - `QuantityTooLarge` if merging duplicates overflows
    /// - `CartTooLarge` if more than `MAX_CART_ITEMS` lines remain
    pub fn from_items(
        items: Vec<CartItem>,
        rules: &CartRules,
    ) -> CoreResult<(Self, Vec<CartItem>)> {
        let mut merged: Vec<CartItem> = Vec::with_capacity(items.len());
        for item in items {
            match merged.iter_mut().find(|i| i.product_id == item.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.checked_add(item.quantity).ok_or(
                        CoreError::QuantityTooLarge {
                            requested: existing.quantity,
                            max: rules.max_quantity,
                        },
                    )?;
                }
                None => merged.push(item),
            }
        }

        let (items, rejected): (Vec<CartItem>, Vec<CartItem>) = merged
            .into_iter()
            .partition(|i| rules.check(i.sale_unit, i.quantity).is_ok());

        if items.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        Ok((Cart { items }, rejected))
    }

    /// Adds a product, or increases the quantity if it is already present.
    ///
    /// ## Errors
    /// - `BelowStep` / `FractionalUnits` for a quantity the product can't be sold in
    /// - `QuantityTooLarge` if the merged quantity would exceed the maximum
    /// - `CartTooLarge` if a new line would not fit
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: Quantity,
        rules: &CartRules,
    ) -> CoreResult<()> {
        rules.check(product.sale_unit, quantity)?;

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let merged = item.quantity + quantity;
            if merged > rules.max_quantity {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: rules.max_quantity,
                });
            }
            item.quantity = merged;
            return Ok(());
        }

        validate_cart_size(self.items.len()).map_err(|_| CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        })?;

        self.items.push(CartItem::from_product(product, quantity));
        Ok(())
    }

    /// Removes the line for `product_id`. Returns whether a line was removed.
    pub fn remove_item(&mut self, product_id: &str) -> bool {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != initial_len
    }

    /// Sets a line's quantity.
    ///
    /// ## Behavior
    /// Requests the line can't hold (below its step, fractional units, above
    /// the maximum) are rejected: nothing changes and `false` is returned.
    /// The quantity is never clamped and the line is never removed here.
    pub fn update_quantity(
        &mut self,
        product_id: &str,
        quantity: Quantity,
        rules: &CartRules,
    ) -> bool {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) if rules.check(item.sale_unit, quantity).is_ok() => {
                item.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    /// Adds one step to a line. Returns whether the line changed.
    pub fn increment(&mut self, product_id: &str, rules: &CartRules) -> bool {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                let next = item.quantity + rules.step_for(item.sale_unit);
                if next > rules.max_quantity {
                    return false;
                }
                item.quantity = next;
                true
            }
            None => false,
        }
    }

    /// Takes one step off a line; the line goes away once it would drop
    /// below its step. Returns whether the cart changed.
    pub fn decrement(&mut self, product_id: &str, rules: &CartRules) -> bool {
        let Some(index) = self.items.iter().position(|i| i.product_id == product_id) else {
            return false;
        };

        let step = rules.step_for(self.items[index].sale_unit);
        let next = self.items[index].quantity.saturating_sub(step);
        if next < step {
            self.items.remove(index);
        } else {
            self.items[index].quantity = next;
        }
        true
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn get(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of all line quantities.
    pub fn total_quantity(&self) -> Quantity {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of line totals, before any discount.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Loyalty
// =============================================================================

/// What the loyalty rule needs to know about the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoyaltyStatus {
    pub authenticated: bool,
    /// Completed orders placed before this one.
    pub completed_orders: u32,
}

impl LoyaltyStatus {
    /// A buyer who is not signed in.
    pub const fn guest() -> Self {
        LoyaltyStatus {
            authenticated: false,
            completed_orders: 0,
        }
    }

    pub const fn member(completed_orders: u32) -> Self {
        LoyaltyStatus {
            authenticated: true,
            completed_orders,
        }
    }

    /// The discount is for the second order: signed in, with exactly one
    /// completed order behind them.
    pub fn qualifies(&self) -> bool {
        self.authenticated && self.completed_orders == 1
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Totals shown in the cart drawer and written into the order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    /// Sum of quantities across lines.
    #[ts(type = "number")]
    pub item_count: Quantity,
    pub line_count: usize,
    pub subtotal: Money,
    /// Rate actually applied (zero when the buyer does not qualify).
    pub discount_rate: DiscountRate,
    pub discount: Money,
    pub total: Money,
}

impl CartSummary {
    /// Computes totals and the loyalty discount.
    ///
    /// ## Example
    /// ```rust
    /// use frutiandante_core::cart::{Cart, CartRules, CartSummary, LoyaltyStatus};
    /// use frutiandante_core::types::DiscountRate;
    ///
    /// let summary = CartSummary::compute(
    ///     &Cart::new(),
    ///     LoyaltyStatus::member(1),
    ///     DiscountRate::from_bps(1000),
    /// );
    /// assert!(summary.total.is_zero());
    /// ```
    pub fn compute(cart: &Cart, loyalty: LoyaltyStatus, rate: DiscountRate) -> Self {
        let subtotal = cart.subtotal();
        let applied = if loyalty.qualifies() {
            rate
        } else {
            DiscountRate::zero()
        };
        let discount = subtotal.portion(applied);

        CartSummary {
            item_count: cart.total_quantity(),
            line_count: cart.line_count(),
            subtotal,
            discount_rate: applied,
            discount,
            total: subtotal - discount,
        }
    }

    pub fn has_discount(&self) -> bool {
        self.discount.is_positive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64, unit: SaleUnit) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Producto {}", id),
            description: None,
            price: Money::from_units(price),
            category_id: None,
            image_url: None,
            sale_unit: unit,
            stock: None,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn whole(n: i64) -> Quantity {
        Quantity::from_whole(n)
    }

    #[test]
    fn test_add_item() {
        let mut cart = Cart::new();
        let rules = CartRules::default();

        cart.add_item(&product("A", 1000, SaleUnit::Unit), whole(2), &rules)
            .unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), whole(2));
        assert_eq!(cart.subtotal(), Money::from_units(2000));
    }

    #[test]
    fn test_add_same_product_merges_quantities() {
        let mut cart = Cart::new();
        let rules = CartRules::default();
        let a = product("A", 1000, SaleUnit::Unit);

        cart.add_item(&a, whole(2), &rules).unwrap();
        cart.add_item(&a, whole(3), &rules).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.get("A").unwrap().quantity, whole(5));
    }

    #[test]
    fn test_add_weight_goods_fractional() {
        let mut cart = Cart::new();
        let rules = CartRules::with_weight_step(Quantity::from_milli(500));
        let palta = product("P", 3990, SaleUnit::Kilogram);

        cart.add_item(&palta, Quantity::from_milli(1500), &rules)
            .unwrap();

        // 3990 × 1.5 = 5985
        assert_eq!(cart.subtotal(), Money::from_units(5985));
    }

    #[test]
    fn test_add_rejects_below_step_and_fractional_units() {
        let mut cart = Cart::new();
        let rules = CartRules::with_weight_step(Quantity::from_milli(500));

        let err = cart
            .add_item(
                &product("P", 3990, SaleUnit::Kilogram),
                Quantity::from_milli(250),
                &rules,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::BelowStep { .. }));

        let err = cart
            .add_item(
                &product("A", 1000, SaleUnit::Unit),
                Quantity::from_milli(1500),
                &rules,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::FractionalUnits(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_rejects_merged_quantity_over_maximum() {
        let mut cart = Cart::new();
        let rules = CartRules::default();
        let a = product("A", 10, SaleUnit::Unit);

        cart.add_item(&a, MAX_ITEM_QUANTITY, &rules).unwrap();
        let err = cart.add_item(&a, whole(1), &rules).unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { .. }));
        assert_eq!(cart.get("A").unwrap().quantity, MAX_ITEM_QUANTITY);
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let mut cart = Cart::new();
        let rules = CartRules::default();
        cart.add_item(&product("A", 1000, SaleUnit::Unit), whole(1), &rules)
            .unwrap();

        assert!(!cart.remove_item("missing"));
        assert_eq!(cart.line_count(), 1);
        assert!(cart.remove_item("A"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_below_step_is_rejected() {
        let mut cart = Cart::new();
        let rules = CartRules::with_weight_step(Quantity::from_milli(500));
        cart.add_item(
            &product("P", 3990, SaleUnit::Kilogram),
            Quantity::from_whole(2),
            &rules,
        )
        .unwrap();

        assert!(!cart.update_quantity("P", Quantity::from_milli(100), &rules));
        assert!(!cart.update_quantity("P", Quantity::zero(), &rules));
        assert_eq!(cart.get("P").unwrap().quantity, whole(2));

        assert!(cart.update_quantity("P", Quantity::from_milli(500), &rules));
        assert_eq!(cart.get("P").unwrap().quantity, Quantity::from_milli(500));
    }

    #[test]
    fn test_increment_and_decrement_by_step() {
        let mut cart = Cart::new();
        let rules = CartRules::with_weight_step(Quantity::from_milli(500));
        cart.add_item(
            &product("P", 2000, SaleUnit::Kilogram),
            Quantity::from_milli(500),
            &rules,
        )
        .unwrap();

        assert!(cart.increment("P", &rules));
        assert_eq!(cart.get("P").unwrap().quantity, Quantity::from_whole(1));

        assert!(cart.decrement("P", &rules));
        assert_eq!(cart.get("P").unwrap().quantity, Quantity::from_milli(500));

        // Dropping below the step removes the line
        assert!(cart.decrement("P", &rules));
        assert!(cart.get("P").is_none());
        assert!(!cart.decrement("P", &rules));
    }

    #[test]
    fn test_from_items_merges_duplicates() {
        let rules = CartRules::default();
        let mut first = Cart::new();
        first
            .add_item(&product("A", 100, SaleUnit::Unit), whole(1), &rules)
            .unwrap();
        let mut items = first.items().to_vec();
        items.extend(first.items().to_vec());

        let (cart, rejected) = Cart::from_items(items, &rules).unwrap();
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), whole(2));
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_from_items_leaves_out_lines_below_step() {
        let rules = CartRules::default();
        let items = vec![
            CartItem::from_product(&product("A", 100, SaleUnit::Kilogram), Quantity::zero()),
            CartItem::from_product(&product("B", 100, SaleUnit::Unit), Quantity::from_milli(500)),
            CartItem::from_product(&product("C", 100, SaleUnit::Unit), whole(3)),
        ];

        let (cart, rejected) = Cart::from_items(items, &rules).unwrap();
        assert_eq!(cart.line_count(), 1);
        assert!(cart.get("C").is_some());
        let ids: Vec<&str> = rejected.iter().map(|i| i.product_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_from_items_overflowing_merge_is_an_error() {
        let rules = CartRules::default();
        let huge = Quantity::from_f64(9e15).unwrap();
        let line = CartItem::from_product(&product("A", 100, SaleUnit::Unit), huge);

        let result = Cart::from_items(vec![line.clone(), line], &rules);
        assert!(matches!(result, Err(CoreError::QuantityTooLarge { .. })));
    }

    #[test]
    fn test_from_items_too_many_lines() {
        let rules = CartRules::default();
        let items: Vec<CartItem> = (0..=MAX_CART_ITEMS)
            .map(|n| CartItem::from_product(&product(&format!("p{}", n), 100, SaleUnit::Unit), whole(1)))
            .collect();

        assert_eq!(
            Cart::from_items(items, &rules),
            Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS })
        );
    }

    #[test]
    fn test_operation_sequence_keeps_invariants() {
        let rules = CartRules::with_weight_step(Quantity::from_milli(250));
        let products = [
            product("A", 1000, SaleUnit::Unit),
            product("B", 2500, SaleUnit::Kilogram),
            product("C", 700, SaleUnit::Unit),
        ];
        let mut cart = Cart::new();

        for round in 0..30_i64 {
            let p = &products[(round % 3) as usize];
            match round % 5 {
                0 | 1 => {
                    let _ = cart.add_item(p, rules.step_for(p.sale_unit), &rules);
                }
                2 => {
                    cart.update_quantity(&p.id, Quantity::from_milli(round * 100), &rules);
                }
                3 => {
                    cart.decrement(&p.id, &rules);
                }
                _ => {
                    cart.remove_item(&p.id);
                }
            }

            let sum: Quantity = cart.items().iter().map(|i| i.quantity).sum();
            assert_eq!(cart.total_quantity(), sum);

            let mut ids: Vec<&str> = cart.items().iter().map(|i| i.product_id.as_str()).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), cart.line_count());
        }
    }

    #[test]
    fn test_loyalty_qualifies_only_for_second_order() {
        assert!(!LoyaltyStatus::guest().qualifies());
        assert!(!LoyaltyStatus::member(0).qualifies());
        assert!(LoyaltyStatus::member(1).qualifies());
        assert!(!LoyaltyStatus::member(2).qualifies());

        // Not signed in never qualifies, whatever the count says
        let odd = LoyaltyStatus {
            authenticated: false,
            completed_orders: 1,
        };
        assert!(!odd.qualifies());
    }

    #[test]
    fn test_summary_with_loyalty_discount() {
        let mut cart = Cart::new();
        cart.add_item(
            &product("A", 1000, SaleUnit::Unit),
            whole(2),
            &CartRules::default(),
        )
        .unwrap();

        let summary = CartSummary::compute(
            &cart,
            LoyaltyStatus::member(1),
            DiscountRate::from_bps(1000),
        );

        assert_eq!(summary.subtotal, Money::from_units(2000));
        assert_eq!(summary.discount, Money::from_units(200));
        assert_eq!(summary.total, Money::from_units(1800));
        assert_eq!(summary.item_count, whole(2));
        assert!(summary.has_discount());
    }

    #[test]
    fn test_summary_without_discount() {
        let mut cart = Cart::new();
        cart.add_item(
            &product("A", 1000, SaleUnit::Unit),
            whole(2),
            &CartRules::default(),
        )
        .unwrap();

        for loyalty in [
            LoyaltyStatus::guest(),
            LoyaltyStatus::member(0),
            LoyaltyStatus::member(3),
        ] {
            let summary = CartSummary::compute(&cart, loyalty, DiscountRate::from_bps(1000));
            assert!(summary.discount.is_zero());
            assert!(summary.discount_rate.is_zero());
            assert_eq!(summary.total, summary.subtotal);
        }
    }

    #[test]
    fn test_cart_json_round_trip() {
        let mut cart = Cart::new();
        let rules = CartRules::default();
        cart.add_item(&product("A", 1000, SaleUnit::Unit), whole(2), &rules)
            .unwrap();
        cart.add_item(
            &product("B", 3990, SaleUnit::Kilogram),
            Quantity::from_milli(1500),
            &rules,
        )
        .unwrap();

        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }
}
