//! # Frutiandante Storefront
//!
//! Runs one storefront session against the in-memory adapters.
//!
//! ## Session
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  config ──► AppContext ──► seed catalogue + settings                    │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │        live catalogue ──► cart ──► sign up ──► order ──► WhatsApp URL   │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │        order completed ──► second order with loyalty discount           │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │        customer opens admin order list ──► refused ──► notification     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::info;

use frutiandante_core::{
    Category, CustomerInfo, Money, Order, OrderStatus, Product, Quantity, Record, SaleUnit,
};
use frutiandante_store::failure::OperationKind;
use frutiandante_store::identity::IdentityProvider;
use frutiandante_store::notify::{Notification, Notifier};
use frutiandante_store::{init_tracing, queries, AppConfig, AppContext};

/// Prints notifications to stderr in place of a UI toast.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        eprintln!("[{:?}] {}: {}", notification.level, notification.title, notification.message);
    }
}

fn product(name: &str, price: i64, sale_unit: SaleUnit, category_id: &str) -> Product {
    Product {
        id: String::new(),
        name: name.to_string(),
        description: None,
        price: Money::from_units(price),
        category_id: Some(category_id.to_string()),
        image_url: None,
        sale_unit,
        stock: None,
        is_active: true,
        created_at: None,
        updated_at: None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::load_or_default(None);
    info!(environment = %config.environment, store = %config.shop.store_name, "Configuration loaded");

    let (mut ctx, store) = AppContext::in_memory(config, Arc::new(ConsoleNotifier));
    let admin = ctx.admin();

    // Catalogue and settings
    let fruit = admin
        .create_category(&Category {
            id: String::new(),
            name: "Frutas".to_string(),
            description: None,
            image_url: None,
            sort_order: 1,
        })
        .await?;
    admin
        .create_product(&product("Manzanas", 1000, SaleUnit::Unit, &fruit))
        .await?;
    admin
        .create_product(&product("Frutillas", 4500, SaleUnit::Kilogram, &fruit))
        .await?;
    admin.update_site_config(&ctx.config().shop.site_config()).await?;

    let catalogue = ctx.live_collection::<Product>(Some(queries::active_products()));
    let settings_doc = ctx.site_settings();
    let settings = ctx.effective_settings(&settings_doc);
    let products = catalogue.state().data;
    info!(products = products.len(), "Catalogue loaded");

    // First order
    ctx.identity()
        .sign_up("cliente@frutiandante.cl", "manzana123", Some("Cliente"))
        .await?;

    let customer = CustomerInfo {
        name: "Cliente".to_string(),
        phone: "+56912345678".to_string(),
        address: "Av. Providencia 1234".to_string(),
        notes: None,
    };

    let mut cart = ctx.cart(&settings);
    for item in &products {
        let quantity = match item.sale_unit {
            SaleUnit::Unit => Quantity::from_whole(2),
            SaleUnit::Kilogram => settings.weight_step,
        };
        cart.add(item, quantity)?;
    }

    let checkout = ctx.checkout();
    let first = checkout
        .place_order(&mut cart, customer.clone(), &settings)
        .await?;
    println!("Pedido {}: {}", first.order_id, first.whatsapp_url);

    // Second order earns the loyalty discount once the first is completed
    admin
        .set_order_status(&first.order_id, OrderStatus::Completed)
        .await?;
    for item in &products {
        cart.add(item, Quantity::from_whole(1))?;
    }
    let second = checkout.place_order(&mut cart, customer, &settings).await?;
    println!(
        "Pedido {}: subtotal {}, descuento {}, total {}",
        second.order_id, second.order.subtotal, second.order.discount, second.order.total
    );
    println!("{}", second.whatsapp_url);

    // A customer opening the admin order list is refused
    store.deny(Order::COLLECTION, OperationKind::List);
    let orders = ctx.live_collection::<Order>(Some(queries::recent_orders(queries::RECENT_ORDERS_LIMIT)));
    if let Some(error) = orders.state().error {
        println!("{}", error.user_message());
    }

    drop(orders);
    drop(catalogue);
    ctx.shutdown();
    Ok(())
}
