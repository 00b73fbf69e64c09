//! # Live Mirrors
//!
//! Keep a local copy of a backend document or query in sync with the
//! backend, and route authorization failures to the [`EventBus`].
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Target Change                                      │
//! │                                                                         │
//! │  set_target(new)                                                        │
//! │     │                                                                   │
//! │     ├── same key as before? ──► no-op                                  │
//! │     │                                                                   │
//! │     ├── generation += 1, state = loading (or inactive)                 │
//! │     ├── previous registration removed                                  │
//! │     └── new listener installed, tagged with the new generation         │
//! │                                                                         │
//! │  Snapshot arrives ──► generation matches? ──► replace state wholesale   │
//! │                               │                                         │
//! │                               └── no ──► dropped                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The generation check covers snapshots that were already in flight when
//! the old registration was removed. Within a generation, a snapshot older
//! (by store revision) than the one already applied is dropped too, and an
//! error ends the generation.
//!
//! [`EventBus`]: crate::events::EventBus

mod collection;
mod document;

pub use collection::LiveCollection;
pub use document::LiveDocument;

use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;

use crate::backend::ListenerRegistration;
use crate::error::StoreError;

// =============================================================================
// Mirror State
// =============================================================================

/// Local copy of a subscription's result.
///
/// ## Invariant
/// While `loading` is true neither `data` nor `error` holds an outcome.
/// Afterwards exactly one of them describes it; an absent document is
/// `data: None` with no error.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<StoreError>,
}

impl<T: Default> MirrorState<T> {
    /// No target: empty, not loading.
    pub fn inactive() -> Self {
        MirrorState {
            data: T::default(),
            loading: false,
            error: None,
        }
    }

    /// Waiting for the first snapshot of a new target.
    pub fn loading() -> Self {
        MirrorState {
            data: T::default(),
            loading: true,
            error: None,
        }
    }

    pub fn ready(data: T) -> Self {
        MirrorState {
            data,
            loading: false,
            error: None,
        }
    }

    pub fn failed(error: StoreError) -> Self {
        MirrorState {
            data: T::default(),
            loading: false,
            error: Some(error),
        }
    }
}

impl<T> MirrorState<T> {
    pub fn is_ready(&self) -> bool {
        !self.loading && self.error.is_none()
    }
}

/// Mirror of a single document.
pub type DocumentState<T> = MirrorState<Option<T>>;

/// Mirror of a query, in backend order.
pub type CollectionState<T> = MirrorState<Vec<T>>;

// =============================================================================
// Shared Slot
// =============================================================================

/// Current target of a mirror and the listener serving it.
struct Slot<K> {
    key: Option<K>,
    generation: u64,
    /// Highest snapshot revision applied for this generation.
    applied: u64,
    registration: Option<ListenerRegistration>,
}

impl<K> Slot<K> {
    /// Moves to a new target. Returns the new generation and the
    /// registration of the previous one.
    fn retarget(&mut self, key: Option<K>) -> (u64, Option<ListenerRegistration>) {
        self.generation += 1;
        self.applied = 0;
        self.key = key;
        (self.generation, self.registration.take())
    }

    /// Records a snapshot at `revision`, unless a newer one was applied.
    fn accept(&mut self, revision: u64) -> bool {
        if revision < self.applied {
            return false;
        }
        self.applied = revision;
        true
    }

    /// A delivered error is final for this generation.
    fn close(&mut self) {
        self.applied = u64::MAX;
    }
}

/// State shared between a mirror and the callbacks it hands to the store.
struct Shared<K, S> {
    slot: Mutex<Slot<K>>,
    state: watch::Sender<S>,
}

impl<K, S> Shared<K, S> {
    fn new(initial: S) -> Self {
        let (state, _) = watch::channel(initial);
        Shared {
            slot: Mutex::new(Slot {
                key: None,
                generation: 0,
                applied: 0,
                registration: None,
            }),
            state,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot<K>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A record store that keeps listener callbacks so tests decide when,
    //! and in what order, snapshots arrive.

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::backend::{
        Document, DocumentCallback, DocumentSnapshot, ListenerRegistration, QueryCallback,
        QuerySnapshot, RecordStore,
    };
    use crate::error::{StoreError, StoreResult};
    use crate::target::{DocumentRef, Query};

    #[derive(Default)]
    pub struct ManualStore {
        pub documents: Mutex<Vec<(DocumentRef, DocumentCallback)>>,
        pub queries: Mutex<Vec<(Query, QueryCallback)>>,
        pub cancelled: Arc<Mutex<Vec<String>>>,
    }

    impl ManualStore {
        /// Callback of the n-th document listener ever installed.
        pub fn document_callback(&self, n: usize) -> DocumentCallback {
            Arc::clone(&self.documents.lock().unwrap()[n].1)
        }

        pub fn query_callback(&self, n: usize) -> QueryCallback {
            Arc::clone(&self.queries.lock().unwrap()[n].1)
        }

        pub fn document_listens(&self) -> usize {
            self.documents.lock().unwrap().len()
        }

        pub fn cancelled(&self) -> Vec<String> {
            self.cancelled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordStore for ManualStore {
        fn listen_document(
            &self,
            reference: &DocumentRef,
            callback: DocumentCallback,
        ) -> ListenerRegistration {
            self.documents
                .lock()
                .unwrap()
                .push((reference.clone(), callback));
            let cancelled = Arc::clone(&self.cancelled);
            let path = reference.path();
            ListenerRegistration::new(move || cancelled.lock().unwrap().push(path))
        }

        fn listen_query(&self, query: &Query, callback: QueryCallback) -> ListenerRegistration {
            self.queries.lock().unwrap().push((query.clone(), callback));
            let cancelled = Arc::clone(&self.cancelled);
            let path = query.collection.clone();
            ListenerRegistration::new(move || cancelled.lock().unwrap().push(path))
        }

        async fn get(&self, _: &DocumentRef) -> StoreResult<DocumentSnapshot> {
            Err(StoreError::Unavailable("manual".into()))
        }

        async fn run_query(&self, _: &Query) -> StoreResult<QuerySnapshot> {
            Err(StoreError::Unavailable("manual".into()))
        }

        async fn create(&self, _: &str, _: Document) -> StoreResult<DocumentRef> {
            Err(StoreError::Unavailable("manual".into()))
        }

        async fn set(&self, _: &DocumentRef, _: Document) -> StoreResult<()> {
            Err(StoreError::Unavailable("manual".into()))
        }

        async fn update(&self, _: &DocumentRef, _: Document) -> StoreResult<()> {
            Err(StoreError::Unavailable("manual".into()))
        }

        async fn delete(&self, _: &DocumentRef) -> StoreResult<()> {
            Err(StoreError::Unavailable("manual".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_constructors() {
        let loading: DocumentState<String> = MirrorState::loading();
        assert!(loading.loading);
        assert_eq!(loading.data, None);

        let failed: CollectionState<String> = MirrorState::failed(StoreError::Unauthenticated);
        assert!(!failed.loading);
        assert!(failed.data.is_empty());
        assert!(!failed.is_ready());

        let ready: DocumentState<String> = MirrorState::ready(None);
        assert!(ready.is_ready());
    }
}
