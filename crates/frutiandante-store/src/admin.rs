//! # Admin Operations
//!
//! Catalogue, order, user and settings management from the admin console.
//! All writes go through [`Writer`], so refused writes reach the error
//! channel like any other.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use frutiandante_core::validation::validate_document_id;
use frutiandante_core::{Category, OrderStatus, Product, Record, SiteConfig, UserProfile, UserRole};

use crate::backend::Document;
use crate::blob::BlobStorage;
use crate::error::StoreResult;
use crate::target::DocumentRef;
use crate::writes::Writer;

fn fields(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

pub struct Admin {
    writer: Writer,
    blobs: Arc<dyn BlobStorage>,
}

impl Admin {
    pub fn new(writer: Writer, blobs: Arc<dyn BlobStorage>) -> Self {
        Admin { writer, blobs }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Adds a product and returns its id.
    pub async fn create_product(&self, product: &Product) -> StoreResult<String> {
        product.validate()?;
        let now = Utc::now();
        let record = Product {
            created_at: Some(now),
            updated_at: Some(now),
            ..product.clone()
        };
        let id = self.writer.create(&record).await?;
        info!(product_id = %id, name = %record.name, "Product created");
        Ok(id)
    }

    pub async fn update_product(&self, id: &str, product: &Product) -> StoreResult<()> {
        validate_document_id(id)?;
        product.validate()?;
        let record = Product {
            updated_at: Some(Utc::now()),
            ..product.clone()
        };
        self.writer.put(id, &record).await
    }

    /// Hides or shows a product in the storefront.
    pub async fn set_product_active(&self, id: &str, active: bool) -> StoreResult<()> {
        validate_document_id(id)?;
        self.writer
            .update_fields(
                &DocumentRef::of::<Product>(id),
                fields(json!({ "isActive": active, "updatedAt": Utc::now() })),
            )
            .await
    }

    pub async fn delete_product(&self, id: &str) -> StoreResult<()> {
        validate_document_id(id)?;
        self.writer.delete(&DocumentRef::of::<Product>(id)).await?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Uploads an image and points the product at it.
    ///
    /// Upload failures are logged and returned; they are not published on
    /// the error channel.
    pub async fn upload_product_image(
        &self,
        id: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<String> {
        validate_document_id(id)?;
        let path = format!("products/{}/{}", id, Uuid::new_v4().simple());

        let url = match self.blobs.upload(&path, bytes, content_type).await {
            Ok(url) => url,
            Err(e) => {
                warn!(product_id = %id, error = %e, "Image upload failed");
                return Err(e);
            }
        };

        self.writer
            .update_fields(
                &DocumentRef::of::<Product>(id),
                fields(json!({ "imageUrl": url, "updatedAt": Utc::now() })),
            )
            .await?;
        Ok(url)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn create_category(&self, category: &Category) -> StoreResult<String> {
        category.validate()?;
        self.writer.create(category).await
    }

    pub async fn update_category(&self, id: &str, category: &Category) -> StoreResult<()> {
        validate_document_id(id)?;
        category.validate()?;
        self.writer.put(id, category).await
    }

    pub async fn delete_category(&self, id: &str) -> StoreResult<()> {
        validate_document_id(id)?;
        self.writer.delete(&DocumentRef::of::<Category>(id)).await
    }

    // =========================================================================
    // Orders, Users, Settings
    // =========================================================================

    pub async fn set_order_status(&self, order_id: &str, status: OrderStatus) -> StoreResult<()> {
        validate_document_id(order_id)?;
        self.writer
            .update_fields(
                &DocumentRef::new(frutiandante_core::Order::COLLECTION, order_id),
                fields(json!({ "status": status.as_str() })),
            )
            .await?;
        info!(order_id, status = status.as_str(), "Order status changed");
        Ok(())
    }

    pub async fn set_user_role(&self, uid: &str, role: UserRole) -> StoreResult<()> {
        validate_document_id(uid)?;
        self.writer
            .update_fields(
                &DocumentRef::of::<UserProfile>(uid),
                fields(json!({ "role": role.as_str() })),
            )
            .await?;
        info!(uid, role = role.as_str(), "User role changed");
        Ok(())
    }

    /// Replaces the site settings document.
    pub async fn update_site_config(&self, config: &SiteConfig) -> StoreResult<()> {
        config.validate()?;
        self.writer.put(SiteConfig::DOCUMENT_ID, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordStore;
    use crate::blob::MemoryBlobStorage;
    use crate::error::StoreError;
    use crate::events::{EventBus, Topic};
    use crate::failure::OperationKind;
    use crate::memory::MemoryStore;
    use frutiandante_core::{DiscountRate, Money, Quantity, SaleUnit};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        store: MemoryStore,
        blobs: Arc<MemoryBlobStorage>,
        admin: Admin,
        events: Arc<AtomicUsize>,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let bus = EventBus::new();
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        bus.on(Topic::PermissionError, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let blobs = Arc::new(MemoryBlobStorage::new());
        let admin = Admin::new(Writer::new(Arc::new(store.clone()), bus), blobs.clone());
        Fixture {
            store,
            blobs,
            admin,
            events,
        }
    }

    fn kiwi() -> Product {
        Product {
            id: String::new(),
            name: "Kiwi".into(),
            description: None,
            price: Money::from_units(1500),
            category_id: None,
            image_url: None,
            sale_unit: SaleUnit::Kilogram,
            stock: Some(10),
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let f = fixture();
        let id = f.admin.create_product(&kiwi()).await.unwrap();
        let reference = DocumentRef::of::<Product>(&id);

        let stored: Product = f.store.get(&reference).await.unwrap().decode().unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert!(stored.created_at.is_some());

        f.admin.set_product_active(&id, false).await.unwrap();
        assert_eq!(f.store.document(&reference).unwrap()["isActive"], false);

        f.admin.delete_product(&id).await.unwrap();
        assert!(f.store.document(&reference).is_none());
    }

    #[tokio::test]
    async fn test_invalid_product_is_not_written() {
        let f = fixture();
        let mut product = kiwi();
        product.name = "  ".into();
        assert!(matches!(
            f.admin.create_product(&product).await,
            Err(StoreError::Core(_))
        ));
        assert_eq!(f.store.count("products"), 0);
    }

    #[tokio::test]
    async fn test_image_upload_sets_url() {
        let f = fixture();
        let id = f.admin.create_product(&kiwi()).await.unwrap();

        let url = f
            .admin
            .upload_product_image(&id, vec![0xFF, 0xD8], "image/jpeg")
            .await
            .unwrap();
        let doc = f.store.document(&DocumentRef::of::<Product>(&id)).unwrap();
        assert_eq!(doc["imageUrl"], url.as_str());
    }

    #[tokio::test]
    async fn test_image_upload_failure_is_local() {
        let f = fixture();
        let id = f.admin.create_product(&kiwi()).await.unwrap();
        f.blobs.set_failing(true);

        let err = f
            .admin
            .upload_product_image(&id, vec![1], "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UploadFailed(_)));
        assert_eq!(f.events.load(Ordering::SeqCst), 0);
        assert!(f.store.document(&DocumentRef::of::<Product>(&id)).unwrap()["imageUrl"].is_null());
    }

    #[tokio::test]
    async fn test_refused_status_change_reaches_channel() {
        let f = fixture();
        f.store.seed(
            &DocumentRef::new("orders", "o1"),
            fields(json!({"status": "pending"})),
        );
        f.store.deny("orders", OperationKind::Update);

        let err = f
            .admin
            .set_order_status("o1", OrderStatus::Completed)
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(f.events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_order_status_and_role_updates() {
        let f = fixture();
        f.store
            .seed(&DocumentRef::new("orders", "o1"), fields(json!({"status": "pending"})));
        f.store
            .seed(&DocumentRef::new("users", "u1"), fields(json!({"email": "a@b.cl"})));

        f.admin.set_order_status("o1", OrderStatus::Completed).await.unwrap();
        f.admin.set_user_role("u1", UserRole::Admin).await.unwrap();

        assert_eq!(
            f.store.document(&DocumentRef::new("orders", "o1")).unwrap()["status"],
            "completed"
        );
        assert_eq!(
            f.store.document(&DocumentRef::new("users", "u1")).unwrap()["role"],
            "admin"
        );
    }

    #[tokio::test]
    async fn test_site_config_written_to_single_document() {
        let f = fixture();
        let config = SiteConfig {
            id: String::new(),
            store_name: "Frutiandante".into(),
            whatsapp_number: "56912345678".into(),
            loyalty_discount: DiscountRate::from_bps(1000),
            weight_step: Quantity::from_milli(250),
            announcement: None,
        };
        f.admin.update_site_config(&config).await.unwrap();

        let doc = f.store.document(&DocumentRef::new("settings", "site")).unwrap();
        assert_eq!(doc["loyaltyDiscount"], 1000);
        assert_eq!(doc["weightStep"], 0.25);
    }

    #[tokio::test]
    async fn test_categories() {
        let f = fixture();
        let category = Category {
            id: String::new(),
            name: "Frutas".into(),
            description: None,
            image_url: None,
            sort_order: 1,
        };
        let id = f.admin.create_category(&category).await.unwrap();
        f.admin
            .update_category(&id, &Category { sort_order: 3, ..category })
            .await
            .unwrap();
        assert_eq!(
            f.store.document(&DocumentRef::new("categories", &id)).unwrap()["sortOrder"],
            3
        );
        f.admin.delete_category(&id).await.unwrap();
        assert_eq!(f.store.count("categories"), 0);
    }
}
