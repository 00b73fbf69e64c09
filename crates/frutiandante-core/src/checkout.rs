//! # Checkout
//!
//! Turns a cart into an order draft and the WhatsApp message that hands the
//! order over to the store.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout                                         │
//! │                                                                         │
//! │  Cart + CustomerInfo + LoyaltyStatus                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  OrderDraft::build() ← validates details, computes CartSummary          │
//! │       │                                                                 │
//! │       ├──► into_order() ──► `orders` document (store crate)            │
//! │       │                                                                 │
//! │       └──► whatsapp_message() ──► whatsapp_url() ──► opened by the UI  │
//! │                                  (no delivery confirmation)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use url::Url;

use crate::cart::{Cart, CartSummary, LoyaltyStatus};
use crate::error::{CoreError, CoreResult};
use crate::types::{CustomerInfo, DiscountRate, Order, OrderItem, OrderStatus};
use crate::validation::{
    validate_address, validate_customer_name, validate_phone, validate_whatsapp_number,
    ValidationResult,
};

/// Base of the click-to-chat link.
pub const WHATSAPP_BASE_URL: &str = "https://wa.me/";

/// A validated order that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub user_id: Option<String>,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub summary: CartSummary,
}

impl OrderDraft {
    /// Validates the checkout form and freezes the cart into order lines.
    ///
    /// ## Errors
    /// - `EmptyCart` when there is nothing to order
    /// - `Validation` for a missing name, phone or address
    pub fn build(
        cart: &Cart,
        customer: CustomerInfo,
        user_id: Option<String>,
        loyalty: LoyaltyStatus,
        rate: DiscountRate,
    ) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        validate_customer(&customer)?;

        let items = cart
            .items()
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                unit_price: line.unit_price,
                sale_unit: line.sale_unit,
                quantity: line.quantity,
                line_total: line.line_total(),
            })
            .collect();

        Ok(OrderDraft {
            user_id,
            customer: CustomerInfo {
                name: customer.name.trim().to_string(),
                phone: customer.phone.trim().to_string(),
                address: customer.address.trim().to_string(),
                notes: customer
                    .notes
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
            },
            items,
            summary: CartSummary::compute(cart, loyalty, rate),
        })
    }

    /// The order document, status `pending`. The id is assigned by the store.
    pub fn into_order(self, created_at: DateTime<Utc>) -> Order {
        Order {
            id: String::new(),
            user_id: self.user_id,
            customer: self.customer,
            items: self.items,
            subtotal: self.summary.subtotal,
            discount: self.summary.discount,
            total: self.summary.total,
            status: OrderStatus::Pending,
            created_at: Some(created_at),
        }
    }

    /// Plain-text message sent to the store's WhatsApp.
    ///
    /// ```text
    /// Hola Frutiandante! Quiero hacer un pedido (#abc123):
    ///
    /// • Palta Hass x 1.5 kg = $5.985
    /// • Limones x 2 un = $1.000
    ///
    /// Subtotal: $6.985
    /// Descuento (10%): -$699
    /// Total: $6.286
    ///
    /// Nombre: Ana
    /// Teléfono: +56 9 1234 5678
    /// Dirección: Av. Siempre Viva 742
    /// Notas: tocar el timbre
    /// ```
    pub fn whatsapp_message(&self, store_name: &str, order_id: Option<&str>) -> String {
        let mut lines = Vec::with_capacity(self.items.len() + 10);

        match order_id {
            Some(id) => lines.push(format!(
                "Hola {}! Quiero hacer un pedido (#{}):",
                store_name, id
            )),
            None => lines.push(format!("Hola {}! Quiero hacer un pedido:", store_name)),
        }
        lines.push(String::new());

        for item in &self.items {
            lines.push(format!(
                "• {} x {} {} = {}",
                item.name,
                item.quantity,
                item.sale_unit.label(),
                item.line_total
            ));
        }
        lines.push(String::new());

        lines.push(format!("Subtotal: {}", self.summary.subtotal));
        if self.summary.has_discount() {
            lines.push(format!(
                "Descuento ({}%): -{}",
                self.summary.discount_rate.percentage(),
                self.summary.discount
            ));
        }
        lines.push(format!("Total: {}", self.summary.total));
        lines.push(String::new());

        lines.push(format!("Nombre: {}", self.customer.name));
        lines.push(format!("Teléfono: {}", self.customer.phone));
        lines.push(format!("Dirección: {}", self.customer.address));
        if let Some(notes) = &self.customer.notes {
            lines.push(format!("Notas: {}", notes));
        }

        lines.join("\n")
    }
}

/// Validates the checkout form fields.
pub fn validate_customer(customer: &CustomerInfo) -> ValidationResult<()> {
    validate_customer_name(&customer.name)?;
    validate_phone(&customer.phone)?;
    validate_address(&customer.address)
}

/// Builds the click-to-chat URL `https://wa.me/<number>?text=<message>`.
pub fn whatsapp_url(number: &str, message: &str) -> CoreResult<Url> {
    validate_whatsapp_number(number)?;

    let base = format!("{}{}", WHATSAPP_BASE_URL, number);
    // The base is built from a validated digit string, so parsing can only
    // fail if WHATSAPP_BASE_URL itself is broken.
    Url::parse_with_params(&base, &[("text", message)]).map_err(|e| {
        CoreError::Validation(crate::error::ValidationError::InvalidFormat {
            field: "whatsapp url".to_string(),
            reason: e.to_string(),
        })
    })
}
