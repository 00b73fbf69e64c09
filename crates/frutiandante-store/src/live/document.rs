//! Live mirror of a single document.

use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};

use frutiandante_core::Record;

use super::{DocumentState, MirrorState, Shared};
use crate::backend::{DocumentCallback, DocumentSnapshot, RecordStore};
use crate::error::StoreResult;
use crate::events::EventBus;
use crate::failure::{OperationFailure, OperationKind};
use crate::target::DocumentRef;

type DocShared<T> = Shared<DocumentRef, DocumentState<T>>;

/// Keeps a [`DocumentState`] in sync with one backend document.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use frutiandante_core::SiteConfig;
/// use frutiandante_store::events::EventBus;
/// use frutiandante_store::live::LiveDocument;
/// use frutiandante_store::memory::MemoryStore;
/// use frutiandante_store::target::DocumentRef;
///
/// let store = Arc::new(MemoryStore::new());
/// let settings = LiveDocument::<SiteConfig>::new(store, EventBus::new());
/// settings.set_target(Some(DocumentRef::of::<SiteConfig>(SiteConfig::DOCUMENT_ID)));
///
/// // Nothing stored yet: absent, not an error.
/// let state = settings.state();
/// assert!(!state.loading);
/// assert!(state.data.is_none());
/// assert!(state.error.is_none());
/// ```
pub struct LiveDocument<T> {
    store: Arc<dyn RecordStore>,
    bus: EventBus,
    shared: Arc<DocShared<T>>,
    _record: PhantomData<fn() -> T>,
}

impl<T> LiveDocument<T>
where
    T: Record + DeserializeOwned,
{
    /// Creates an inactive mirror.
    pub fn new(store: Arc<dyn RecordStore>, bus: EventBus) -> Self {
        LiveDocument {
            store,
            bus,
            shared: Arc::new(Shared::new(MirrorState::inactive())),
            _record: PhantomData,
        }
    }

    /// Creates a mirror already pointed at `target`.
    pub fn watching(store: Arc<dyn RecordStore>, bus: EventBus, target: DocumentRef) -> Self {
        let live = Self::new(store, bus);
        live.set_target(Some(target));
        live
    }

    /// Points the mirror at a document, or at nothing.
    ///
    /// Setting the current target again does nothing. Otherwise the previous
    /// listener is removed before the new one is installed.
    pub fn set_target(&self, target: Option<DocumentRef>) {
        let (generation, previous) = {
            let mut slot = self.shared.slot();
            if slot.key == target {
                return;
            }
            let retargeted = slot.retarget(target.clone());
            self.shared.state.send_replace(match target {
                Some(_) => MirrorState::loading(),
                None => MirrorState::inactive(),
            });
            retargeted
        };

        if let Some(mut previous) = previous {
            previous.remove();
        }

        let Some(reference) = target else {
            debug!("Document mirror cleared");
            return;
        };
        debug!(path = %reference, generation, "Document mirror subscribing");

        let callback = self.callback(&reference, generation);
        let mut registration = self.store.listen_document(&reference, callback);

        let mut slot = self.shared.slot();
        if slot.generation == generation {
            slot.registration = Some(registration);
        } else {
            drop(slot);
            registration.remove();
        }
    }

    fn callback(&self, reference: &DocumentRef, generation: u64) -> DocumentCallback {
        let weak: Weak<DocShared<T>> = Arc::downgrade(&self.shared);
        let bus = self.bus.clone();
        let path = reference.path();

        Arc::new(move |result: StoreResult<DocumentSnapshot>| {
            let Some(shared) = weak.upgrade() else {
                return;
            };

            let failure = {
                let mut slot = shared.slot();
                if slot.generation != generation {
                    debug!(path = %path, generation, "Dropping late document snapshot");
                    return;
                }

                let decoded = match result {
                    Ok(snapshot) => {
                        if !slot.accept(snapshot.revision) {
                            debug!(
                                path = %path,
                                revision = snapshot.revision,
                                "Dropping out-of-order document snapshot"
                            );
                            return;
                        }
                        snapshot.decode::<T>()
                    }
                    Err(err) => {
                        slot.close();
                        Err(err)
                    }
                };

                match decoded {
                    Ok(data) => {
                        shared.state.send_replace(MirrorState::ready(data));
                        None
                    }
                    Err(err) => {
                        let failure = if err.is_permission_denied() {
                            Some(OperationFailure::read(path.clone(), OperationKind::Get))
                        } else {
                            warn!(path = %path, error = %err, "Document mirror failed");
                            None
                        };
                        shared.state.send_replace(MirrorState::failed(err));
                        failure
                    }
                }
            };

            if let Some(failure) = failure {
                bus.publish_failure(failure);
            }
        })
    }

    /// Current mirror state.
    pub fn state(&self) -> DocumentState<T> {
        self.shared.state.borrow().clone()
    }

    /// Change notifications for the mirror state.
    pub fn subscribe(&self) -> watch::Receiver<DocumentState<T>> {
        self.shared.state.subscribe()
    }

    pub fn target(&self) -> Option<DocumentRef> {
        self.shared.slot().key.clone()
    }

    /// Tears the listener down and resets to inactive.
    pub fn stop(&self) {
        self.set_target(None);
    }
}

impl<T> Drop for LiveDocument<T> {
    fn drop(&mut self) {
        let (_, previous) = self.shared.slot().retarget(None);
        if let Some(mut previous) = previous {
            previous.remove();
        }
    }
}
