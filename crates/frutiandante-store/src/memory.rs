//! # In-Memory Record Store
//!
//! A [`RecordStore`] kept entirely in process memory. Used by the storefront
//! binary in development and by every test in this crate.
//!
//! ## Behaviour
//! - Listeners receive the current state synchronously from `listen_*`,
//!   then a fresh snapshot after every write that touches them
//! - Access rules are a deny list of `(collection, operation)` pairs
//! - Denying `get`/`list` on a collection fails the listeners already
//!   attached to it, the way a revoked rule does on the hosted backend
//! - `set_unavailable(true)` makes every call fail with `Unavailable`
//!
//! Callbacks always run with the store unlocked, so concurrent writers may
//! deliver out of order. Every snapshot carries the revision it was taken
//! at; live mirrors discard ones older than what they already hold.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::backend::{
    Document, DocumentCallback, DocumentSnapshot, ListenerRegistration, QueryCallback,
    QuerySnapshot, RecordStore,
};
use crate::error::{StoreError, StoreResult};
use crate::failure::OperationKind;
use crate::target::{DocumentRef, Query};

type Collections = BTreeMap<String, BTreeMap<String, Document>>;

#[derive(Default)]
struct Inner {
    collections: Collections,
    denied: HashSet<(String, OperationKind)>,
    unavailable: bool,
    /// Bumped by every write; stamped on every snapshot.
    revision: u64,
    next_listener: u64,
    document_listeners: HashMap<u64, (DocumentRef, DocumentCallback)>,
    query_listeners: HashMap<u64, (Query, QueryCallback)>,
}

impl Inner {
    fn check(&self, collection: &str, operation: OperationKind, path: &str) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable("record store offline".to_string()));
        }
        if self.denied.contains(&(collection.to_string(), operation)) {
            return Err(StoreError::PermissionDenied {
                path: path.to_string(),
                operation,
            });
        }
        Ok(())
    }

    fn snapshot(&self, reference: &DocumentRef) -> DocumentSnapshot {
        DocumentSnapshot {
            reference: reference.clone(),
            data: self
                .collections
                .get(&reference.collection)
                .and_then(|docs| docs.get(&reference.id))
                .cloned(),
            revision: self.revision,
        }
    }

    fn evaluate(&self, query: &Query) -> QuerySnapshot {
        let Some(docs) = self.collections.get(&query.collection) else {
            return QuerySnapshot {
                documents: Vec::new(),
                revision: self.revision,
            };
        };

        let mut documents: Vec<(DocumentRef, Document)> = docs
            .iter()
            .filter(|(_, data)| query.matches(data))
            .map(|(id, data)| {
                (
                    DocumentRef::new(query.collection.clone(), id.clone()),
                    data.clone(),
                )
            })
            .collect();

        documents.sort_by(|(_, a), (_, b)| query.compare(a, b));
        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }
        QuerySnapshot {
            documents,
            revision: self.revision,
        }
    }

    fn exists(&self, reference: &DocumentRef) -> bool {
        self.collections
            .get(&reference.collection)
            .is_some_and(|docs| docs.contains_key(&reference.id))
    }

    /// Applies a write and returns the notifications it causes.
    fn apply(&mut self, reference: &DocumentRef, data: Option<Document>) -> Vec<Notification> {
        self.revision += 1;
        match data {
            Some(data) => {
                self.collections
                    .entry(reference.collection.clone())
                    .or_default()
                    .insert(reference.id.clone(), data);
            }
            None => {
                if let Some(docs) = self.collections.get_mut(&reference.collection) {
                    docs.remove(&reference.id);
                }
            }
        }

        let mut out = Vec::new();
        for (target, callback) in self.document_listeners.values() {
            if target == reference {
                out.push(Notification::Document(
                    Arc::clone(callback),
                    Ok(self.snapshot(target)),
                ));
            }
        }
        for (query, callback) in self.query_listeners.values() {
            if query.collection == reference.collection {
                out.push(Notification::Query(Arc::clone(callback), Ok(self.evaluate(query))));
            }
        }
        out
    }
}

enum Notification {
    Document(DocumentCallback, StoreResult<DocumentSnapshot>),
    Query(QueryCallback, StoreResult<QuerySnapshot>),
}

fn deliver(notifications: Vec<Notification>) {
    for notification in notifications {
        match notification {
            Notification::Document(callback, result) => callback(result),
            Notification::Query(callback, result) => callback(result),
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-memory record store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses an operation on a collection from now on.
    pub fn deny(&self, collection: &str, operation: OperationKind) {
        let failed = {
            let mut inner = lock(&self.inner);
            inner.denied.insert((collection.to_string(), operation));

            let mut failed = Vec::new();
            if operation == OperationKind::Get {
                let ids: Vec<u64> = inner
                    .document_listeners
                    .iter()
                    .filter(|(_, (r, _))| r.collection == collection)
                    .map(|(id, _)| *id)
                    .collect();
                for id in ids {
                    if let Some((reference, callback)) = inner.document_listeners.remove(&id) {
                        failed.push(Notification::Document(
                            callback,
                            Err(StoreError::PermissionDenied {
                                path: reference.path(),
                                operation,
                            }),
                        ));
                    }
                }
            }
            if operation == OperationKind::List {
                let ids: Vec<u64> = inner
                    .query_listeners
                    .iter()
                    .filter(|(_, (q, _))| q.collection == collection)
                    .map(|(id, _)| *id)
                    .collect();
                for id in ids {
                    if let Some((_, callback)) = inner.query_listeners.remove(&id) {
                        failed.push(Notification::Query(
                            callback,
                            Err(StoreError::PermissionDenied {
                                path: collection.to_string(),
                                operation,
                            }),
                        ));
                    }
                }
            }
            failed
        };
        debug!(collection, operation = %operation, "Access denied");
        deliver(failed);
    }

    /// Lifts a previous [`deny`](Self::deny).
    pub fn allow(&self, collection: &str, operation: OperationKind) {
        lock(&self.inner)
            .denied
            .remove(&(collection.to_string(), operation));
    }

    /// Makes every call fail with `Unavailable` (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.inner).unavailable = unavailable;
    }

    /// Writes a document without access checks. Listeners are notified.
    pub fn seed(&self, reference: &DocumentRef, data: Document) {
        let notifications = lock(&self.inner).apply(reference, Some(data));
        deliver(notifications);
    }

    /// Current body of a document, bypassing access checks.
    pub fn document(&self, reference: &DocumentRef) -> Option<Document> {
        lock(&self.inner).snapshot(reference).data
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        lock(&self.inner)
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Number of installed listeners (documents and queries).
    pub fn listener_count(&self) -> usize {
        let inner = lock(&self.inner);
        inner.document_listeners.len() + inner.query_listeners.len()
    }

    fn write(
        &self,
        reference: &DocumentRef,
        operation: OperationKind,
        check_path: &str,
        data: Option<Document>,
    ) -> StoreResult<()> {
        let notifications = {
            let mut inner = lock(&self.inner);
            inner.check(&reference.collection, operation, check_path)?;
            inner.apply(reference, data)
        };
        trace!(path = %reference, operation = %operation, "Write applied");
        deliver(notifications);
        Ok(())
    }
}

fn cancel_document(inner: Weak<Mutex<Inner>>, id: u64) -> impl FnOnce() + Send + 'static {
    move || {
        if let Some(inner) = inner.upgrade() {
            lock(&inner).document_listeners.remove(&id);
        }
    }
}

fn cancel_query(inner: Weak<Mutex<Inner>>, id: u64) -> impl FnOnce() + Send + 'static {
    move || {
        if let Some(inner) = inner.upgrade() {
            lock(&inner).query_listeners.remove(&id);
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn listen_document(
        &self,
        reference: &DocumentRef,
        callback: DocumentCallback,
    ) -> ListenerRegistration {
        let result = {
            let mut inner = lock(&self.inner);
            match inner.check(&reference.collection, OperationKind::Get, &reference.path()) {
                Ok(()) => {
                    let id = inner.next_listener;
                    inner.next_listener += 1;
                    inner
                        .document_listeners
                        .insert(id, (reference.clone(), Arc::clone(&callback)));
                    Ok((id, inner.snapshot(reference)))
                }
                Err(e) => Err(e),
            }
        };

        match result {
            Ok((id, snapshot)) => {
                trace!(path = %reference, listener = id, "Document listener installed");
                callback(Ok(snapshot));
                ListenerRegistration::new(cancel_document(Arc::downgrade(&self.inner), id))
            }
            Err(e) => {
                callback(Err(e));
                ListenerRegistration::noop()
            }
        }
    }

    fn listen_query(&self, query: &Query, callback: QueryCallback) -> ListenerRegistration {
        let result = {
            let mut inner = lock(&self.inner);
            match inner.check(&query.collection, OperationKind::List, &query.collection) {
                Ok(()) => {
                    let id = inner.next_listener;
                    inner.next_listener += 1;
                    inner
                        .query_listeners
                        .insert(id, (query.clone(), Arc::clone(&callback)));
                    Ok((id, inner.evaluate(query)))
                }
                Err(e) => Err(e),
            }
        };

        match result {
            Ok((id, snapshot)) => {
                trace!(collection = %query.collection, listener = id, "Query listener installed");
                callback(Ok(snapshot));
                ListenerRegistration::new(cancel_query(Arc::downgrade(&self.inner), id))
            }
            Err(e) => {
                callback(Err(e));
                ListenerRegistration::noop()
            }
        }
    }

    async fn get(&self, reference: &DocumentRef) -> StoreResult<DocumentSnapshot> {
        let inner = lock(&self.inner);
        inner.check(&reference.collection, OperationKind::Get, &reference.path())?;
        Ok(inner.snapshot(reference))
    }

    async fn run_query(&self, query: &Query) -> StoreResult<QuerySnapshot> {
        let inner = lock(&self.inner);
        inner.check(&query.collection, OperationKind::List, &query.collection)?;
        Ok(inner.evaluate(query))
    }

    async fn create(&self, collection: &str, data: Document) -> StoreResult<DocumentRef> {
        let reference = DocumentRef::new(collection, Uuid::new_v4().simple().to_string());
        self.write(&reference, OperationKind::Create, collection, Some(data))?;
        Ok(reference)
    }

    async fn set(&self, reference: &DocumentRef, data: Document) -> StoreResult<()> {
        let operation = if lock(&self.inner).exists(reference) {
            OperationKind::Update
        } else {
            OperationKind::Create
        };
        self.write(reference, operation, &reference.path(), Some(data))
    }

    async fn update(&self, reference: &DocumentRef, fields: Document) -> StoreResult<()> {
        let notifications = {
            let mut inner = lock(&self.inner);
            inner.check(&reference.collection, OperationKind::Update, &reference.path())?;
            let Some(mut merged) = inner.snapshot(reference).data else {
                return Err(StoreError::NotFound(reference.path()));
            };
            merged.extend(fields);
            inner.apply(reference, Some(merged))
        };
        deliver(notifications);
        Ok(())
    }

    async fn delete(&self, reference: &DocumentRef) -> StoreResult<()> {
        self.write(reference, OperationKind::Delete, &reference.path(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Direction;
    use serde_json::{json, Value};

    fn body(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn recorder() -> (DocumentCallback, Arc<Mutex<Vec<StoreResult<DocumentSnapshot>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: DocumentCallback = Arc::new(move |r| sink.lock().unwrap().push(r));
        (callback, seen)
    }

    #[tokio::test]
    async fn test_revision_grows_with_every_write() {
        let store = MemoryStore::new();
        let reference = DocumentRef::new("products", "p1");
        let before = store.get(&reference).await.unwrap().revision;

        store
            .set(&reference, body(json!({"name": "Kiwi"})))
            .await
            .unwrap();
        let after_set = store.get(&reference).await.unwrap().revision;
        store.delete(&reference).await.unwrap();
        let after_delete = store.run_query(&Query::collection("products")).await.unwrap().revision;

        assert!(after_set > before);
        assert!(after_delete > after_set);
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryStore::new();
        let reference = store
            .create("products", body(json!({"name": "Kiwi"})))
            .await
            .unwrap();

        let snapshot = store.get(&reference).await.unwrap();
        assert_eq!(snapshot.data.unwrap()["name"], "Kiwi");
        assert_eq!(store.count("products"), 1);
    }

    #[tokio::test]
    async fn test_update_merges_and_requires_existing() {
        let store = MemoryStore::new();
        let reference = DocumentRef::new("products", "p1");
        store.seed(&reference, body(json!({"name": "Kiwi", "price": 1})));

        store
            .update(&reference, body(json!({"price": 2})))
            .await
            .unwrap();
        let doc = store.document(&reference).unwrap();
        assert_eq!(doc["name"], "Kiwi");
        assert_eq!(doc["price"], 2);

        let missing = DocumentRef::new("products", "nope");
        let err = store.update(&missing, Document::new()).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound("products/nope".into()));
    }

    #[tokio::test]
    async fn test_denied_create_reports_collection_path() {
        let store = MemoryStore::new();
        store.deny("orders", OperationKind::Create);

        let err = store.create("orders", Document::new()).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::PermissionDenied {
                path: "orders".into(),
                operation: OperationKind::Create,
            }
        );
        assert_eq!(store.count("orders"), 0);
    }

    #[tokio::test]
    async fn test_set_checks_create_or_update() {
        let store = MemoryStore::new();
        let reference = DocumentRef::new("settings", "site");
        store.deny("settings", OperationKind::Update);

        store.set(&reference, body(json!({"a": 1}))).await.unwrap();
        let err = store.set(&reference, body(json!({"a": 2}))).await.unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_document_listener_sees_changes() {
        let store = MemoryStore::new();
        let reference = DocumentRef::new("products", "p1");
        let (callback, seen) = recorder();

        let _registration = store.listen_document(&reference, callback);
        store.seed(&reference, body(json!({"name": "Kiwi"})));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].as_ref().unwrap().data, None);
        assert!(seen[1].as_ref().unwrap().exists());
    }

    #[test]
    fn test_dropping_registration_stops_delivery() {
        let store = MemoryStore::new();
        let reference = DocumentRef::new("products", "p1");
        let (callback, seen) = recorder();

        let registration = store.listen_document(&reference, callback);
        assert_eq!(store.listener_count(), 1);
        drop(registration);
        assert_eq!(store.listener_count(), 0);

        store.seed(&reference, body(json!({"name": "Kiwi"})));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_denied_listener_gets_error_and_is_not_installed() {
        let store = MemoryStore::new();
        store.deny("orders", OperationKind::Get);
        let (callback, seen) = recorder();

        let registration = store.listen_document(&DocumentRef::new("orders", "o1"), callback);
        assert!(!registration.is_active());
        assert_eq!(store.listener_count(), 0);
        assert!(seen.lock().unwrap()[0].as_ref().unwrap_err().is_permission_denied());
    }

    #[test]
    fn test_deny_fails_active_listeners() {
        let store = MemoryStore::new();
        let (callback, seen) = recorder();
        let _registration = store.listen_document(&DocumentRef::new("users", "u1"), callback);

        store.deny("users", OperationKind::Get);
        assert_eq!(store.listener_count(), 0);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].as_ref().unwrap_err().is_permission_denied());
    }

    #[tokio::test]
    async fn test_query_filters_orders_and_limits() {
        let store = MemoryStore::new();
        for (id, name, active) in [("a", "Uva", true), ("b", "Kiwi", true), ("c", "Pera", false)] {
            store.seed(
                &DocumentRef::new("products", id),
                body(json!({"name": name, "isActive": active})),
            );
        }

        let query = Query::collection("products")
            .where_eq("isActive", true)
            .order_by("name", Direction::Ascending)
            .limit(5);
        let snapshot = store.run_query(&query).await.unwrap();
        let ids: Vec<&str> = snapshot.documents.iter().map(|(r, _)| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let limited = store.run_query(&query.clone().limit(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.get(&DocumentRef::new("x", "y")).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!err.is_permission_denied());
    }
}
