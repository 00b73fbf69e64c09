//! # Writer
//!
//! Typed writes to the record store.
//!
//! Every write returns a `Result` to its caller. When the access rules
//! refuse it, the refusal is also published on the [`EventBus`] with the
//! payload that was sent, before the error is returned.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use frutiandante_core::Record;

use crate::backend::{to_document, Document, RecordStore};
use crate::error::{StoreError, StoreResult};
use crate::events::EventBus;
use crate::failure::{OperationFailure, OperationKind};
use crate::target::DocumentRef;

#[derive(Clone)]
pub struct Writer {
    store: Arc<dyn RecordStore>,
    bus: EventBus,
}

impl Writer {
    pub fn new(store: Arc<dyn RecordStore>, bus: EventBus) -> Self {
        Writer { store, bus }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Adds a record with a generated id and returns the id.
    pub async fn create<T>(&self, record: &T) -> StoreResult<String>
    where
        T: Record + Serialize,
    {
        let data = to_document(record)?;
        let result = self.store.create(T::COLLECTION, data.clone()).await;
        match result {
            Ok(reference) => {
                debug!(path = %reference, "Document created");
                Ok(reference.id)
            }
            Err(err) => Err(self.report(err, T::COLLECTION, OperationKind::Create, Some(data))),
        }
    }

    /// Writes a record under a known id, replacing the stored body.
    pub async fn put<T>(&self, id: &str, record: &T) -> StoreResult<()>
    where
        T: Record + Serialize,
    {
        let reference = DocumentRef::of::<T>(id);
        let data = to_document(record)?;

        match self.store.set(&reference, data.clone()).await {
            Ok(()) => {
                debug!(path = %reference, "Document written");
                Ok(())
            }
            // The store decides between create and update; report what it refused.
            Err(err) => {
                let operation = match &err {
                    StoreError::PermissionDenied { operation, .. } => *operation,
                    _ => OperationKind::Update,
                };
                Err(self.report(err, &reference.path(), operation, Some(data)))
            }
        }
    }

    /// Merges fields into an existing document.
    pub async fn update_fields(&self, reference: &DocumentRef, fields: Document) -> StoreResult<()> {
        match self.store.update(reference, fields.clone()).await {
            Ok(()) => {
                debug!(path = %reference, fields = fields.len(), "Document updated");
                Ok(())
            }
            Err(err) => Err(self.report(
                err,
                &reference.path(),
                OperationKind::Update,
                Some(fields),
            )),
        }
    }

    pub async fn delete(&self, reference: &DocumentRef) -> StoreResult<()> {
        match self.store.delete(reference).await {
            Ok(()) => {
                debug!(path = %reference, "Document deleted");
                Ok(())
            }
            Err(err) => Err(self.report(err, &reference.path(), OperationKind::Delete, None)),
        }
    }

    /// Publishes authorization failures; everything else is only logged.
    fn report(
        &self,
        err: StoreError,
        path: &str,
        operation: OperationKind,
        data: Option<Document>,
    ) -> StoreError {
        if err.is_permission_denied() {
            self.bus.publish_failure(OperationFailure::write(
                path,
                operation,
                data.map(Value::Object),
            ));
        } else {
            warn!(path, operation = %operation, error = %err, "Write failed");
        }
        err
    }
}
