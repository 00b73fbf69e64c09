//! Live mirror of a query.

use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};

use frutiandante_core::Record;

use super::{CollectionState, MirrorState, Shared};
use crate::backend::{QueryCallback, QuerySnapshot, RecordStore};
use crate::error::StoreResult;
use crate::events::EventBus;
use crate::failure::{OperationFailure, OperationKind};
use crate::target::Query;

type QueryShared<T> = Shared<Query, CollectionState<T>>;

/// Keeps a [`CollectionState`] in sync with a backend query.
///
/// Records keep the order the backend returns; nothing is re-sorted here.
/// One malformed document fails the whole snapshot.
pub struct LiveCollection<T> {
    store: Arc<dyn RecordStore>,
    bus: EventBus,
    shared: Arc<QueryShared<T>>,
    _record: PhantomData<fn() -> T>,
}

impl<T> LiveCollection<T>
where
    T: Record + DeserializeOwned,
{
    pub fn new(store: Arc<dyn RecordStore>, bus: EventBus) -> Self {
        LiveCollection {
            store,
            bus,
            shared: Arc::new(Shared::new(MirrorState::inactive())),
            _record: PhantomData,
        }
    }

    pub fn watching(store: Arc<dyn RecordStore>, bus: EventBus, query: Query) -> Self {
        let live = Self::new(store, bus);
        live.set_target(Some(query));
        live
    }

    /// Points the mirror at a query, or at nothing.
    ///
    /// Queries compare by value, so rebuilding an equal query is a no-op.
    pub fn set_target(&self, target: Option<Query>) {
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

        let Some(query) = target else {
            debug!("Collection mirror cleared");
            return;
        };
        debug!(collection = %query.collection, generation, "Collection mirror subscribing");

        let callback = self.callback(&query, generation);
        let mut registration = self.store.listen_query(&query, callback);

        let mut slot = self.shared.slot();
        if slot.generation == generation {
            slot.registration = Some(registration);
        } else {
            drop(slot);
            registration.remove();
        }
    }

    fn callback(&self, query: &Query, generation: u64) -> QueryCallback {
        let weak: Weak<QueryShared<T>> = Arc::downgrade(&self.shared);
        let bus = self.bus.clone();
        let path = query.collection.clone();

        Arc::new(move |result: StoreResult<QuerySnapshot>| {
            let Some(shared) = weak.upgrade() else {
                return;
            };

            let failure = {
                let mut slot = shared.slot();
                if slot.generation != generation {
                    debug!(collection = %path, generation, "Dropping late query snapshot");
                    return;
                }

                let decoded = match result {
                    Ok(snapshot) => {
                        if !slot.accept(snapshot.revision) {
                            debug!(
                                collection = %path,
                                revision = snapshot.revision,
                                "Dropping out-of-order query snapshot"
                            );
                            return;
                        }
                        snapshot.decode_all::<T>()
                    }
                    Err(err) => {
                        slot.close();
                        Err(err)
                    }
                };

                match decoded {
                    Ok(records) => {
                        shared.state.send_replace(MirrorState::ready(records));
                        None
                    }
                    Err(err) => {
                        let failure = if err.is_permission_denied() {
                            Some(OperationFailure::read(path.clone(), OperationKind::List))
                        } else {
                            warn!(collection = %path, error = %err, "Collection mirror failed");
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

    pub fn state(&self) -> CollectionState<T> {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CollectionState<T>> {
        self.shared.state.subscribe()
    }

    pub fn target(&self) -> Option<Query> {
        self.shared.slot().key.clone()
    }

    pub fn stop(&self) {
        self.set_target(None);
    }
}

impl<T> Drop for LiveCollection<T> {
    fn drop(&mut self) {
        let (_, previous) = self.shared.slot().retarget(None);
        if let Some(mut previous) = previous {
            previous.remove();
        }
    }
}
