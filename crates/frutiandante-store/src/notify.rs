//! # Failure Listener
//!
//! The single top-level consumer of the error channel. It turns refused
//! operations into something the user sees.
//!
//! ## Policy
//! | Environment  | Notification                        | Log            |
//! |--------------|-------------------------------------|----------------|
//! | development  | blocking overlay with path, operation and payload (JSON) | `error!` |
//! | production   | short, non-technical error message  | `error!`       |
//!
//! The overlay stands in for an uncaught exception: it stays up until a
//! developer dismisses it.

use std::sync::{Arc, Mutex};

use tracing::error;

use crate::config::Environment;
use crate::events::{AppEvent, EventBus, HandlerId, Topic};
use crate::failure::OperationFailure;

/// Message shown to customers when the backend refuses an operation.
pub const PERMISSION_MESSAGE: &str =
    "No tienes permiso para realizar esta acción. Si crees que es un error, inicia sesión nuevamente.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
    /// Blocks the screen until dismissed. Development builds only.
    Overlay,
}

/// Something to show in the UI (toast, banner, overlay).
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

/// UI surface for notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Keeps notifications in memory. The storefront binary prints them; tests
/// inspect them.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    received: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(
            &mut *self
                .received
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}

/// Subscribes to permission failures for as long as it lives.
pub struct FailureListener {
    bus: EventBus,
    handler: Option<HandlerId>,
}

impl FailureListener {
    /// Registers the listener on the bus.
    pub fn attach(bus: &EventBus, environment: Environment, notifier: Arc<dyn Notifier>) -> Self {
        let handler = bus.on(Topic::PermissionError, move |event| match event {
            AppEvent::PermissionDenied(failure) => {
                error!(
                    path = %failure.path,
                    operation = %failure.operation,
                    "Permission denied by record store"
                );
                notifier.notify(render(failure, environment));
            }
        });

        FailureListener {
            bus: bus.clone(),
            handler: Some(handler),
        }
    }

    /// Unregisters the listener. Safe to call more than once.
    pub fn detach(&mut self) {
        if let Some(handler) = self.handler.take() {
            self.bus.off(Topic::PermissionError, handler);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.handler.is_some()
    }
}

impl Drop for FailureListener {
    fn drop(&mut self) {
        self.detach();
    }
}

/// What the user sees for a failure.
pub fn render(failure: &OperationFailure, environment: Environment) -> Notification {
    match environment {
        Environment::Development => Notification {
            level: NotificationLevel::Overlay,
            title: "Permission denied".to_string(),
            message: serde_json::to_string_pretty(&failure.detail())
                .unwrap_or_else(|_| failure.to_string()),
        },
        Environment::Production => Notification {
            level: NotificationLevel::Error,
            title: "Acceso denegado".to_string(),
            message: PERMISSION_MESSAGE.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::OperationKind;
    use serde_json::json;

    fn refused_create() -> OperationFailure {
        OperationFailure::write(
            "orders",
            OperationKind::Create,
            Some(json!({"total": 1800, "customer": {"phone": "+56912345678"}})),
        )
    }

    #[test]
    fn test_development_shows_detail() {
        let bus = EventBus::new();
        let notifier = Arc::new(CollectingNotifier::new());
        let _listener = FailureListener::attach(&bus, Environment::Development, notifier.clone());

        bus.publish_failure(refused_create());
        let received = notifier.take();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].level, NotificationLevel::Overlay);
        assert!(received[0].message.contains("\"method\": \"create\""));
        assert!(received[0].message.contains("\"path\": \"orders\""));
        assert!(received[0].message.contains("1800"));
    }

    #[test]
    fn test_production_hides_detail() {
        let bus = EventBus::new();
        let notifier = Arc::new(CollectingNotifier::new());
        let _listener = FailureListener::attach(&bus, Environment::Production, notifier.clone());

        bus.publish_failure(refused_create());
        let received = notifier.take();
        assert_eq!(received[0].level, NotificationLevel::Error);
        assert_eq!(received[0].message, PERMISSION_MESSAGE);
        assert!(!received[0].message.contains("orders"));
    }

    #[test]
    fn test_detach_stops_notifications() {
        let bus = EventBus::new();
        let notifier = Arc::new(CollectingNotifier::new());
        let mut listener = FailureListener::attach(&bus, Environment::Production, notifier.clone());

        listener.detach();
        listener.detach();
        assert!(!listener.is_attached());
        bus.publish_failure(refused_create());
        assert!(notifier.take().is_empty());
    }

    #[test]
    fn test_drop_detaches() {
        let bus = EventBus::new();
        {
            let _listener = FailureListener::attach(
                &bus,
                Environment::Production,
                Arc::new(CollectingNotifier::new()),
            );
            assert_eq!(bus.handler_count(Topic::PermissionError), 1);
        }
        assert_eq!(bus.handler_count(Topic::PermissionError), 0);
    }
}
