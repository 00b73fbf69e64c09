//! # Checkout Service
//!
//! Places an order from the persistent cart and prepares the WhatsApp
//! handoff.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  current identity ──► loyalty_status() ──► OrderDraft::build()          │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                                  Writer::create(orders) ── Err ──► cart │
//! │                                                  │          untouched   │
//! │                                                  ▼                      │
//! │                           whatsapp_message() + whatsapp_url()           │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                                   cart cleared, receipt returned        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Opening the URL is up to the UI; delivery is never confirmed.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use url::Url;

use frutiandante_core::checkout::{whatsapp_url, OrderDraft};
use frutiandante_core::validation::validate_whatsapp_number;
use frutiandante_core::{CustomerInfo, Order, SiteConfig};

use crate::cart_store::PersistentCart;
use crate::error::StoreResult;
use crate::identity::{loyalty_status, IdentityProvider};
use crate::writes::Writer;

/// Outcome of a successful checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub order_id: String,
    pub order: Order,
    pub message: String,
    pub whatsapp_url: Url,
}

pub struct CheckoutService {
    writer: Writer,
    identity: Arc<dyn IdentityProvider>,
}

impl CheckoutService {
    pub fn new(writer: Writer, identity: Arc<dyn IdentityProvider>) -> Self {
        CheckoutService { writer, identity }
    }

    /// Writes the order and returns the WhatsApp link.
    ///
    /// The cart is cleared only once the order document exists.
    pub async fn place_order(
        &self,
        cart: &mut PersistentCart,
        customer: CustomerInfo,
        settings: &SiteConfig,
    ) -> StoreResult<CheckoutReceipt> {
        validate_whatsapp_number(&settings.whatsapp_number)?;

        let identity = self.identity.current();
        let loyalty = loyalty_status(self.writer.store().as_ref(), identity.as_ref()).await?;
        let draft = OrderDraft::build(
            cart.cart(),
            customer,
            identity.map(|i| i.uid),
            loyalty,
            settings.loyalty_discount,
        )?;

        let mut order = draft.clone().into_order(Utc::now());
        let order_id = self.writer.create(&order).await?;
        order.id = order_id.clone();

        let message = draft.whatsapp_message(&settings.store_name, Some(&order_id));
        let url = whatsapp_url(&settings.whatsapp_number, &message)?;

        cart.clear();
        info!(
            order_id = %order_id,
            total = order.total.units(),
            discount = order.discount.units(),
            "Order placed"
        );

        Ok(CheckoutReceipt {
            order_id,
            order,
            message,
            whatsapp_url: url,
        })
    }
}
