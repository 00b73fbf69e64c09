//! # Application Context
//!
//! Owns the collaborators of a storefront session and hands out the
//! services built on them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          AppContext                                     │
//! │                                                                         │
//! │  ┌──────────┐ ┌─────────────┐ ┌────────────┐ ┌─────────────┐            │
//! │  │ EventBus │ │ RecordStore │ │ Identity   │ │ BlobStorage │            │
//! │  └────┬─────┘ └──────┬──────┘ └─────┬──────┘ └──────┬──────┘            │
//! │       │              │              │               │                   │
//! │       │      ┌───────┴──────┬───────┴──────┬────────┴─────┐             │
//! │       ▼      ▼              ▼              ▼              ▼             │
//! │  FailureListener   LiveDocument/    CheckoutService      Admin          │
//! │  (attached at      LiveCollection                                       │
//! │   construction)                                                         │
//! │                                                                         │
//! │  LocalStorage ──► PersistentCart                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use frutiandante_core::cart::CartRules;
use frutiandante_core::{Record, SiteConfig};

use crate::admin::Admin;
use crate::backend::RecordStore;
use crate::blob::{BlobStorage, MemoryBlobStorage};
use crate::cart_store::PersistentCart;
use crate::checkout::CheckoutService;
use crate::config::AppConfig;
use crate::events::EventBus;
use crate::identity::{IdentityProvider, MemoryIdentity};
use crate::live::{LiveCollection, LiveDocument};
use crate::memory::MemoryStore;
use crate::notify::{FailureListener, Notifier};
use crate::storage::{FileStorage, LocalStorage, MemoryStorage};
use crate::target::{DocumentRef, Query};
use crate::writes::Writer;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=frutiandante_store=trace` - Listener-level detail
/// - Default: `info,frutiandante=debug`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,frutiandante=debug"));

    // A subscriber may already be installed (tests, embedding apps).
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Collaborators of a session.
pub struct Collaborators {
    pub store: Arc<dyn RecordStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub blobs: Arc<dyn BlobStorage>,
    pub storage: Arc<dyn LocalStorage>,
}

pub struct AppContext {
    config: AppConfig,
    bus: EventBus,
    store: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    blobs: Arc<dyn BlobStorage>,
    storage: Arc<dyn LocalStorage>,
    listener: FailureListener,
}

impl AppContext {
    /// Builds a context and attaches the failure listener to its bus.
    pub fn new(
        config: AppConfig,
        bus: EventBus,
        collaborators: Collaborators,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let listener = FailureListener::attach(&bus, config.environment, notifier);
        info!(environment = %config.environment, "Storefront context ready");

        AppContext {
            config,
            bus,
            store: collaborators.store,
            identity: collaborators.identity,
            blobs: collaborators.blobs,
            storage: collaborators.storage,
            listener,
        }
    }

    /// Context backed entirely by in-memory adapters (local storage follows
    /// the `[cart]` settings). Returns the store so callers can seed it.
    pub fn in_memory(config: AppConfig, notifier: Arc<dyn Notifier>) -> (Self, MemoryStore) {
        let bus = EventBus::new();
        let memory = MemoryStore::new();
        let store: Arc<dyn RecordStore> = Arc::new(memory.clone());
        let identity = MemoryIdentity::shared(Writer::new(Arc::clone(&store), bus.clone()));
        let storage = local_storage(&config);

        let collaborators = Collaborators {
            store,
            identity,
            blobs: Arc::new(MemoryBlobStorage::new()),
            storage,
        };
        (Self::new(config, bus, collaborators, notifier), memory)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    pub fn writer(&self) -> Writer {
        Writer::new(Arc::clone(&self.store), self.bus.clone())
    }

    pub fn admin(&self) -> Admin {
        Admin::new(self.writer(), Arc::clone(&self.blobs))
    }

    pub fn checkout(&self) -> CheckoutService {
        CheckoutService::new(self.writer(), Arc::clone(&self.identity))
    }

    pub fn live_document<T>(&self, target: Option<DocumentRef>) -> LiveDocument<T>
    where
        T: Record + DeserializeOwned,
    {
        let live = LiveDocument::new(Arc::clone(&self.store), self.bus.clone());
        live.set_target(target);
        live
    }

    pub fn live_collection<T>(&self, query: Option<Query>) -> LiveCollection<T>
    where
        T: Record + DeserializeOwned,
    {
        let live = LiveCollection::new(Arc::clone(&self.store), self.bus.clone());
        live.set_target(query);
        live
    }

    /// Live mirror of the `settings/site` document.
    pub fn site_settings(&self) -> LiveDocument<SiteConfig> {
        self.live_document(Some(DocumentRef::of::<SiteConfig>(SiteConfig::DOCUMENT_ID)))
    }

    /// Site settings from the mirror, or the configured fallback.
    pub fn effective_settings(&self, live: &LiveDocument<SiteConfig>) -> SiteConfig {
        live.state()
            .data
            .unwrap_or_else(|| self.config.shop.site_config())
    }

    /// Restores the customer's cart under the given site settings
    /// (usually [`effective_settings`](Self::effective_settings)). Call
    /// [`PersistentCart::apply_settings`] when they change.
    pub fn cart(&self, settings: &SiteConfig) -> PersistentCart {
        PersistentCart::load(
            Arc::clone(&self.storage),
            self.config.cart.storage_key.clone(),
            CartRules::with_weight_step(settings.weight_step),
        )
    }

    /// Detaches the failure listener. Mirrors stop when dropped.
    pub fn shutdown(&mut self) {
        self.listener.detach();
        info!("Storefront context shut down");
    }
}

fn local_storage(config: &AppConfig) -> Arc<dyn LocalStorage> {
    if !config.cart.persist {
        return Arc::new(MemoryStorage::new());
    }
    if let Some(path) = &config.cart.storage_path {
        return Arc::new(FileStorage::new(path.clone()));
    }
    match FileStorage::in_data_dir() {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            warn!(error = %e, "No data directory, cart will not survive restarts");
            Arc::new(MemoryStorage::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Topic;
    use crate::failure::OperationKind;
    use crate::notify::CollectingNotifier;
    use crate::queries;
    use frutiandante_core::{Product, Quantity};
    use serde_json::json;

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.cart.persist = false;
        config
    }

    #[test]
    fn test_listener_attached_and_shutdown() {
        let notifier = Arc::new(CollectingNotifier::new());
        let (mut ctx, _store) = AppContext::in_memory(memory_config(), notifier);
        assert_eq!(ctx.bus().handler_count(Topic::PermissionError), 1);

        ctx.shutdown();
        assert_eq!(ctx.bus().handler_count(Topic::PermissionError), 0);
    }

    #[test]
    fn test_denied_read_reaches_notifier() {
        let notifier = Arc::new(CollectingNotifier::new());
        let (ctx, store) = AppContext::in_memory(memory_config(), notifier.clone());
        store.deny("orders", OperationKind::List);

        let orders = ctx.live_collection::<frutiandante_core::Order>(Some(queries::recent_orders(10)));
        assert!(orders.state().error.is_some());
        assert_eq!(notifier.take().len(), 1);
    }

    #[test]
    fn test_effective_settings_prefers_document() {
        let (ctx, store) =
            AppContext::in_memory(memory_config(), Arc::new(CollectingNotifier::new()));
        let live = ctx.site_settings();
        assert_eq!(ctx.effective_settings(&live).store_name, "Frutiandante");

        store.seed(
            &DocumentRef::new("settings", "site"),
            json!({"storeName": "Frutiandante Centro", "whatsappNumber": "56911112222"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert_eq!(ctx.effective_settings(&live).store_name, "Frutiandante Centro");
    }

    #[test]
    fn test_cart_follows_site_document_weight_step() {
        let (ctx, store) =
            AppContext::in_memory(memory_config(), Arc::new(CollectingNotifier::new()));
        store.seed(
            &DocumentRef::new("settings", "site"),
            json!({"storeName": "Frutiandante", "whatsappNumber": "56911112222", "weightStep": 0.25})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let live = ctx.site_settings();
        let settings = ctx.effective_settings(&live);
        assert_eq!(settings.weight_step, Quantity::from_milli(250));
        assert_ne!(ctx.config().shop.weight_step, settings.weight_step);

        let mut cart = ctx.cart(&settings);

        let product = Product {
            id: "p".into(),
            name: "Nueces".into(),
            description: None,
            price: frutiandante_core::Money::from_units(12000),
            category_id: None,
            image_url: None,
            sale_unit: frutiandante_core::SaleUnit::Kilogram,
            stock: None,
            is_active: true,
            created_at: None,
            updated_at: None,
        };
        cart.add(&product, Quantity::from_milli(250)).unwrap();
        assert!(cart.increment("p"));
        assert_eq!(cart.cart().get("p").unwrap().quantity, Quantity::from_milli(500));
    }
}
