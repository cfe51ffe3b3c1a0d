//! Routing of server-initiated notifications to registered observers.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::protocol::JsonRpcNotification;

/// Observer callback for inbound notifications.
pub type NotificationHandler = Arc<dyn Fn(&JsonRpcNotification) + Send + Sync>;

/// Append-only, ordered registry of notification handlers.
#[derive(Default)]
pub struct NotificationDispatcher {
    handlers: RwLock<Vec<NotificationHandler>>,
}

impl NotificationDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler. Handlers are never deduplicated or removed.
    pub fn register<F>(&self, handler: F)
    where
        F: Fn(&JsonRpcNotification) + Send + Sync + 'static,
    {
        self.handlers.write().push(Arc::new(handler));
    }

    /// Invoke every handler in registration order.
    ///
    /// A panicking handler is not caught and stops delivery to the handlers
    /// after it.
    pub fn dispatch(&self, notification: &JsonRpcNotification) {
        // Snapshot so a handler may register further handlers.
        let handlers = self.handlers.read().clone();
        tracing::debug!(
            method = %notification.method,
            handlers = handlers.len(),
            "dispatching notification"
        );
        for handler in &handlers {
            handler(notification);
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("handlers", &self.len())
            .finish()
    }
}
