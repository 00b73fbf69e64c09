//! # Domain Types
//!
//! Typed records for every entity the storefront reads from or writes to
//! the record store.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Category     │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  name           │   │  name           │   │  customer       │       │
//! │  │  price (Money)  │   │  sort_order     │   │  items          │       │
//! │  │  sale_unit      │   │                 │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  UserProfile    │   │   SiteConfig    │   │  DiscountRate   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  email          │   │  whatsapp no.   │   │  bps (u32)      │       │
//! │  │  role           │   │  loyalty bps    │   │  1000 = 10%     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identifiers
//! The record store keeps the identifier in the document path, not in the
//! body. Every entity therefore carries `id` as `#[serde(skip_serializing)]`:
//! it is filled in from the snapshot when decoding and never written back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::Quantity;
use crate::validation::{self, ValidationResult};

// =============================================================================
// Record Trait
// =============================================================================

/// An entity stored as a document in a named collection.
///
/// `validate` runs after decoding a snapshot so malformed backend data is
/// rejected at the boundary instead of reaching the UI.
pub trait Record: Clone + Send + Sync + 'static {
    /// Collection the entity lives in.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn validate(&self) -> ValidationResult<()> {
        Ok(())
    }
}

// =============================================================================
// Discount Rate
// =============================================================================

/// Discount rate in basis points.
///
/// 1 basis point = 0.01%, so 1000 bps = 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        DiscountRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Percentage, for display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Product
// =============================================================================

/// How a product is measured in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleUnit {
    /// Sold per item; quantities are whole numbers.
    #[default]
    Unit,
    /// Sold by weight; quantities are fractional kilograms.
    Kilogram,
}

impl SaleUnit {
    /// Short label used in order messages.
    pub fn label(&self) -> &'static str {
        match self {
            SaleUnit::Unit => "un",
            SaleUnit::Kilogram => "kg",
        }
    }
}

/// A product shown in the storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, skip_serializing)]
    pub id: String,

    /// Display name.
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Price of one unit, or of one kilogram for weight-sold goods.
    pub price: Money,

    #[serde(default)]
    pub category_id: Option<String>,

    /// Retrieval URL returned by blob storage.
    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default)]
    pub sale_unit: SaleUnit,

    /// Units (or kilograms) on hand, when tracked.
    #[serde(default)]
    pub stock: Option<i64>,

    /// Inactive products are hidden from the storefront but kept for orders.
    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Record for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn validate(&self) -> ValidationResult<()> {
        validation::validate_product_name(&self.name)?;
        validation::validate_price(self.price)
    }
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Position in the storefront menu (ascending).
    #[serde(default)]
    pub sort_order: i32,
}

impl Record for Category {
    const COLLECTION: &'static str = "categories";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn validate(&self) -> ValidationResult<()> {
        validation::validate_category_name(&self.name)
    }
}

// =============================================================================
// Order
// =============================================================================

/// Order lifecycle as managed from the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Sent from checkout, not yet reviewed.
    #[default]
    Pending,
    /// Accepted by the store.
    Confirmed,
    /// Delivered and paid. Counts towards loyalty.
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Snake-case name as stored in documents and used in query filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// Contact and delivery details captured at checkout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A line in a placed order.
/// Snapshot of the cart line: later product edits do not change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    #[serde(default)]
    pub sale_unit: SaleUnit,
    #[ts(type = "number")]
    pub quantity: Quantity,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, skip_serializing)]
    pub id: String,

    /// Authenticated buyer, if any. Guest checkouts have none.
    #[serde(default)]
    pub user_id: Option<String>,

    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    #[serde(default)]
    pub discount: Money,
    pub total: Money,
    #[serde(default)]
    pub status: OrderStatus,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn validate(&self) -> ValidationResult<()> {
        validation::validate_price(self.subtotal)?;
        validation::validate_price(self.total)
    }
}

// =============================================================================
// User Profile
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Admin => "admin",
        }
    }
}

/// Profile document stored at `users/<uid>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl Record for UserProfile {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn validate(&self) -> ValidationResult<()> {
        validation::validate_email(&self.email)
    }
}

// =============================================================================
// Site Configuration
// =============================================================================

/// Store-wide settings edited from the admin console.
/// A single document: `settings/site`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub store_name: String,
    /// International format without `+`, e.g. `56912345678`.
    pub whatsapp_number: String,
    #[serde(default)]
    pub loyalty_discount: DiscountRate,
    /// Smallest kilogram increment offered for weight-sold goods.
    #[serde(default = "default_weight_step")]
    #[ts(type = "number")]
    pub weight_step: Quantity,
    /// Banner text shown on the storefront, if any.
    #[serde(default)]
    pub announcement: Option<String>,
}

fn default_weight_step() -> Quantity {
    crate::DEFAULT_WEIGHT_STEP
}

impl SiteConfig {
    /// Identifier of the single settings document.
    pub const DOCUMENT_ID: &'static str = "site";
}

impl Record for SiteConfig {
    const COLLECTION: &'static str = "settings";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn validate(&self) -> ValidationResult<()> {
        validation::validate_whatsapp_number(&self.whatsapp_number)?;
        validation::validate_discount_bps(self.loyalty_discount.bps())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_discount_rate_from_percentage() {
        let rate = DiscountRate::from_percentage(10.0);
        assert_eq!(rate.bps(), 1000);
        assert!((rate.percentage() - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_product_decodes_camel_case_with_defaults() {
        let product: Product = serde_json::from_value(json!({
            "name": "Palta Hass",
            "price": 3990,
            "saleUnit": "kilogram",
            "categoryId": "frutas"
        }))
        .unwrap();

        assert_eq!(product.id, "");
        assert_eq!(product.price, Money::from_units(3990));
        assert_eq!(product.sale_unit, SaleUnit::Kilogram);
        assert_eq!(product.category_id.as_deref(), Some("frutas"));
        assert!(product.is_active);
    }

    #[test]
    fn test_id_is_not_written_to_document_body() {
        let category = Category {
            id: "abc".to_string(),
            name: "Verduras".to_string(),
            description: None,
            image_url: None,
            sort_order: 2,
        };
        let value = serde_json::to_value(&category).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["sortOrder"], 2);
    }

    #[test]
    fn test_product_missing_price_fails_to_decode() {
        let result: Result<Product, _> = serde_json::from_value(json!({ "name": "Sin precio" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_order_status_names() {
        assert_eq!(OrderStatus::Completed.as_str(), "completed");
        assert_eq!(
            serde_json::to_value(OrderStatus::Completed).unwrap(),
            json!("completed")
        );
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_site_config_default_weight_step() {
        let config: SiteConfig = serde_json::from_value(json!({
            "storeName": "Frutiandante",
            "whatsappNumber": "56912345678"
        }))
        .unwrap();
        assert_eq!(config.weight_step, crate::DEFAULT_WEIGHT_STEP);
        assert!(config.loyalty_discount.is_zero());
    }

    #[test]
    fn test_record_validation() {
        let product = Product {
            id: "p1".to_string(),
            name: "".to_string(),
            description: None,
            price: Money::from_units(100),
            category_id: None,
            image_url: None,
            sale_unit: SaleUnit::Unit,
            stock: None,
            is_active: true,
            created_at: None,
            updated_at: None,
        };
        assert!(product.validate().is_err());
    }
}
