//! # frutiandante-core: Pure Business Logic for Frutiandante
//!
//! This crate holds the storefront's business rules as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Frutiandante Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Storefront + Admin UI                           │   │
//! │  │    Catalogue ──► Cart drawer ──► Checkout ──► WhatsApp          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       frutiandante-store (live queries, writes, storage)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ frutiandante-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ checkout  │  │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │ OrderDraft│  │   │
//! │  │   │  Order    │  │ Quantity  │  │  Loyalty  │  │ WhatsApp  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO BACKEND • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity records (Product, Category, Order, UserProfile, SiteConfig)
//! - [`money`] - Integer money
//! - [`quantity`] - Integer thousandths for fractional kilograms
//! - [`cart`] - Cart operations, totals and the loyalty discount
//! - [`checkout`] - Order drafts and the WhatsApp handoff message
//! - [`validation`] - Input and record validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use frutiandante_core::cart::{Cart, CartRules, CartSummary, LoyaltyStatus};
//! use frutiandante_core::types::{DiscountRate, Product, SaleUnit};
//! use frutiandante_core::{Money, Quantity};
//!
//! let product = Product {
//!     id: "A".to_string(),
//!     name: "Manzanas".to_string(),
//!     description: None,
//!     price: Money::from_units(1000),
//!     category_id: None,
//!     image_url: None,
//!     sale_unit: SaleUnit::Unit,
//!     stock: None,
//!     is_active: true,
//!     created_at: None,
//!     updated_at: None,
//! };
//!
//! let mut cart = Cart::new();
//! cart.add_item(&product, Quantity::from_whole(2), &CartRules::default()).unwrap();
//!
//! // Second order of a signed-in customer: 10% off
//! let summary = CartSummary::compute(&cart, LoyaltyStatus::member(1), DiscountRate::from_bps(1000));
//! assert_eq!(summary.subtotal.units(), 2000);
//! assert_eq!(summary.discount.units(), 200);
//! assert_eq!(summary.total.units(), 1800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod quantity;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use quantity::Quantity;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line (units or kilograms).
///
/// ## Business Reason
/// Catches typos like 1000 instead of 1.0 before they reach WhatsApp.
pub const MAX_ITEM_QUANTITY: Quantity = Quantity::from_whole(999);

/// Default kilogram step for weight-sold goods (half a kilo).
pub const DEFAULT_WEIGHT_STEP: Quantity = Quantity::from_milli(500);
