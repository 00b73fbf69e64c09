//! # Event Bus
//!
//! Process-wide publish/subscribe channel for authorization failures.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Error Channel                                  │
//! │                                                                         │
//! │  LiveDocument ──┐                                                       │
//! │  LiveCollection ├──► emit(PermissionDenied) ──► handler 1 (listener)   │
//! │  Writer ────────┘          │                    handler 2               │
//! │                            │                    ...                     │
//! │                            └── synchronous, in registration order       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Notes
//! The bus is an owned value handed to every adapter, not a global. Clones
//! share the same handler table.
//!
//! Handlers are invoked with the table unlocked, so a handler may register
//! or unregister handlers (including itself) without deadlocking. Such
//! changes take effect from the next `emit`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, trace};

use crate::failure::OperationFailure;

// =============================================================================
// Topics & Events
// =============================================================================

/// Topic names on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Backend refused an operation.
    PermissionError,
}

impl Topic {
    pub fn name(&self) -> &'static str {
        match self {
            Topic::PermissionError => "permission-error",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event published on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    PermissionDenied(OperationFailure),
}

impl AppEvent {
    pub fn topic(&self) -> Topic {
        match self {
            AppEvent::PermissionDenied(_) => Topic::PermissionError,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Token returned by [`EventBus::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(&AppEvent) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<Topic, Vec<(HandlerId, Handler)>>>,
}

// =============================================================================
// Event Bus
// =============================================================================

/// Typed publish/subscribe channel.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a topic.
    pub fn on<F>(&self, topic: Topic, handler: F) -> HandlerId
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers()
            .entry(topic)
            .or_default()
            .push((id, Arc::new(handler)));
        debug!(topic = %topic, handler = id.0, "Handler registered");
        id
    }

    /// Unregisters a handler. Unknown ids are ignored.
    ///
    /// Returns whether a handler was removed.
    pub fn off(&self, topic: Topic, id: HandlerId) -> bool {
        let mut handlers = self.handlers();
        let Some(list) = handlers.get_mut(&topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(h, _)| *h != id);
        let removed = list.len() != before;
        if removed {
            debug!(topic = %topic, handler = id.0, "Handler unregistered");
        }
        removed
    }

    /// Delivers an event to every handler registered for its topic,
    /// synchronously and in registration order.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: AppEvent) -> usize {
        let topic = event.topic();
        // Snapshot the list so handlers run with the table unlocked.
        let snapshot: Vec<Handler> = self
            .handlers()
            .get(&topic)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        trace!(topic = %topic, handlers = snapshot.len(), "Emitting event");
        for handler in &snapshot {
            handler(&event);
        }
        snapshot.len()
    }

    /// Shorthand for emitting a permission failure.
    pub fn publish_failure(&self, failure: OperationFailure) -> usize {
        self.emit(AppEvent::PermissionDenied(failure))
    }

    pub fn handler_count(&self, topic: Topic) -> usize {
        self.handlers().get(&topic).map_or(0, Vec::len)
    }

    fn handlers(&self) -> MutexGuard<'_, HashMap<Topic, Vec<(HandlerId, Handler)>>> {
        // A panicking handler runs outside the lock, so poisoning can only
        // come from a panic inside this module; the table is still valid.
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("permission_handlers", &self.handler_count(Topic::PermissionError))
            .finish()
    }
}
