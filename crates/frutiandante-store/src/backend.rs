//! # Record Store Port
//!
//! The boundary to the hosted document database. Adapters implement
//! [`RecordStore`]; the rest of the crate only talks to the trait.
//!
//! ## Snapshot Delivery
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  listen_document(ref, cb) ──► ListenerRegistration                      │
//! │                                                                         │
//! │   cb(Ok(snapshot))   initial state, then after every change             │
//! │   cb(Err(e))         listener failed (e.g. PermissionDenied)            │
//! │                                                                         │
//! │  Dropping or calling remove() on the registration cancels delivery.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callbacks may be invoked from any thread, including synchronously from
//! inside `listen_*` itself.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use frutiandante_core::Record;

use crate::error::{StoreError, StoreResult};
use crate::target::{DocumentRef, Query};

/// Raw document body.
pub type Document = Map<String, Value>;

// =============================================================================
// Snapshots
// =============================================================================

/// State of one document. `data` is `None` when it does not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub reference: DocumentRef,
    pub data: Option<Document>,
    /// Store revision the snapshot was taken at. Revisions only grow, so a
    /// listener can tell an older snapshot that arrives late.
    pub revision: u64,
}

impl DocumentSnapshot {
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Decodes into a record, with the id taken from the reference.
    pub fn decode<T>(&self) -> StoreResult<Option<T>>
    where
        T: Record + DeserializeOwned,
    {
        match &self.data {
            Some(data) => decode_document(&self.reference, data).map(Some),
            None => Ok(None),
        }
    }
}

/// Result set of a query, already filtered, ordered and limited.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySnapshot {
    pub documents: Vec<(DocumentRef, Document)>,
    /// See [`DocumentSnapshot::revision`].
    pub revision: u64,
}

impl QuerySnapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Decodes every document. One malformed document fails the whole set.
    pub fn decode_all<T>(&self) -> StoreResult<Vec<T>>
    where
        T: Record + DeserializeOwned,
    {
        self.documents
            .iter()
            .map(|(reference, data)| decode_document(reference, data))
            .collect()
    }
}

/// Deserializes a document body, injects the id and validates the record.
pub fn decode_document<T>(reference: &DocumentRef, data: &Document) -> StoreResult<T>
where
    T: Record + DeserializeOwned,
{
    let decode_err = |reason: String| StoreError::Decode {
        path: reference.path(),
        reason,
    };

    let mut record: T =
        serde_json::from_value(Value::Object(data.clone())).map_err(|e| decode_err(e.to_string()))?;
    record.set_id(reference.id.clone());
    record.validate().map_err(|e| decode_err(e.to_string()))?;
    Ok(record)
}

/// Serializes a record into a document body. The id is not part of it.
pub fn to_document<T: Serialize>(record: &T) -> StoreResult<Document> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::SerializationFailed(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

// =============================================================================
// Listener Registration
// =============================================================================

pub type DocumentCallback = Arc<dyn Fn(StoreResult<DocumentSnapshot>) + Send + Sync>;
pub type QueryCallback = Arc<dyn Fn(StoreResult<QuerySnapshot>) + Send + Sync>;

/// Handle of an active listener. Cancels it on drop.
pub struct ListenerRegistration {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerRegistration {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        ListenerRegistration {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Registration for a listener that was never installed.
    pub fn noop() -> Self {
        ListenerRegistration { cancel: None }
    }

    /// Cancels the listener. Safe to call more than once.
    pub fn remove(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// Record Store Trait
// =============================================================================

/// Hosted document database.
///
/// Every method reports refused operations as [`StoreError::PermissionDenied`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Subscribes to one document.
    fn listen_document(
        &self,
        reference: &DocumentRef,
        callback: DocumentCallback,
    ) -> ListenerRegistration;

    /// Subscribes to a query.
    fn listen_query(&self, query: &Query, callback: QueryCallback) -> ListenerRegistration;

    async fn get(&self, reference: &DocumentRef) -> StoreResult<DocumentSnapshot>;

    async fn run_query(&self, query: &Query) -> StoreResult<QuerySnapshot>;

    /// Adds a document with a generated id.
    async fn create(&self, collection: &str, data: Document) -> StoreResult<DocumentRef>;

    /// Writes a document, replacing any existing body.
    async fn set(&self, reference: &DocumentRef, data: Document) -> StoreResult<()>;

    /// Merges fields into an existing document.
    ///
    /// ## Errors
    /// `NotFound` if the document does not exist.
    async fn update(&self, reference: &DocumentRef, fields: Document) -> StoreResult<()>;

    async fn delete(&self, reference: &DocumentRef) -> StoreResult<()>;
}
