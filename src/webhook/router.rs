use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::webhook::{HandlerResult, VerifiedEvent, WebhookEventType};

/// Error returned by an event handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handles one kind of verified webhook event.
///
/// Implemented for any `Fn(&VerifiedEvent) -> Result<HandlerResult, HandlerError>`.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &VerifiedEvent) -> Result<HandlerResult, HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(&VerifiedEvent) -> Result<HandlerResult, HandlerError> + Send + Sync,
{
    fn handle(&self, event: &VerifiedEvent) -> Result<HandlerResult, HandlerError> {
        self(event)
    }
}

/// Acknowledges an event as processed without doing anything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcknowledgeHandler;

impl EventHandler for AcknowledgeHandler {
    fn handle(&self, event: &VerifiedEvent) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::processed(event.event_type()))
    }
}

/// Dispatch table from event type to handler.
///
/// Types without a registered handler fall through to a fallback that reports
/// `{"status": "ignored", "event": <type>}`. Registration may run concurrently
/// with dispatch.
///
/// ```
/// use licensechain::webhook::{
///     EventRouter, HandlerError, HandlerResult, VerifiedEvent, WebhookEventType,
/// };
///
/// let router = EventRouter::new();
/// router.register(
///     WebhookEventType::LicenseRevoked,
///     |event: &VerifiedEvent| -> Result<HandlerResult, HandlerError> {
///         Ok(HandlerResult::processed(event.event_type()).with_field("revoked", true))
///     },
/// );
///
/// assert!(router.is_registered(&WebhookEventType::LicenseRevoked));
/// assert!(!router.is_registered(&"invoice.sent".into()));
/// ```
pub struct EventRouter {
    handlers: RwLock<HashMap<WebhookEventType, Arc<dyn EventHandler>>>,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRouter {
    /// Router acknowledging every known event type.
    pub fn new() -> Self {
        let router = Self::empty();
        for event_type in WebhookEventType::KNOWN {
            router.register(event_type, AcknowledgeHandler);
        }
        router
    }

    /// Router with no handlers; every event goes to the fallback.
    pub fn empty() -> Self {
        EventRouter {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `handler` for `event_type`, replacing any previous one.
    pub fn register(
        &self,
        event_type: impl Into<WebhookEventType>,
        handler: impl EventHandler + 'static,
    ) {
        self.handlers
            .write()
            .insert(event_type.into(), Arc::new(handler));
    }

    /// Removes the handler for `event_type`, returning whether one was registered.
    pub fn unregister(&self, event_type: &WebhookEventType) -> bool {
        self.handlers.write().remove(event_type).is_some()
    }

    pub fn is_registered(&self, event_type: &WebhookEventType) -> bool {
        self.handlers.read().contains_key(event_type)
    }

    /// Registered event types, sorted by tag.
    pub fn registered_events(&self) -> Vec<WebhookEventType> {
        let mut events: Vec<_> = self.handlers.read().keys().cloned().collect();
        events.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        events
    }

    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    /// Invokes the handler registered for the event's type, or the fallback.
    ///
    /// Handler errors are returned unchanged.
    pub fn dispatch(&self, event: &VerifiedEvent) -> Result<HandlerResult, HandlerError> {
        // The lock is released before the handler runs, so handlers may re-register.
        let handler = self.handlers.read().get(event.event_type()).cloned();

        match handler {
            Some(handler) => handler.handle(event),
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("No handler for webhook event '{}'; ignoring", event.event_type());

                Ok(HandlerResult::ignored(event.event_type()))
            }
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("registered_events", &self.registered_events())
            .finish()
    }
}
