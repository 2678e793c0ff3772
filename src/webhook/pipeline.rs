use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    errors::WebhookError,
    types::AnyJson,
    webhook::{
        EventRouter, HandlerResult, ReplayGuard, SignatureAlgorithm, SignatureVerifier,
        VerifiedEvent, WebhookDelivery, event::created_at,
    },
};

/// Result of handling one delivery.
///
/// Serializes as the handler record when handled, and as
/// `{"valid": false, "error": "<message>"}` when rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Handled(HandlerResult),
    Rejected(WebhookError),
}

impl WebhookOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, WebhookOutcome::Handled(_))
    }

    pub fn as_handled(&self) -> Option<&HandlerResult> {
        match self {
            WebhookOutcome::Handled(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_rejected(&self) -> Option<&WebhookError> {
        match self {
            WebhookOutcome::Rejected(err) => Some(err),
            _ => None,
        }
    }

    pub fn to_json(&self) -> AnyJson {
        serde_json::to_value(self).unwrap_or(AnyJson::Null)
    }
}

impl Serialize for WebhookOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WebhookOutcome::Handled(result) => result.serialize(serializer),
            WebhookOutcome::Rejected(err) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("valid", &false)?;
                map.serialize_entry("error", &err.to_string())?;
                map.end()
            }
        }
    }
}

/// Verifies, checks freshness, parses and dispatches inbound deliveries.
///
/// Nothing in the body is parsed before its signature has been verified. Every
/// failure is reported as [`WebhookOutcome::Rejected`]; handling never panics or
/// returns an error.
///
/// ```
/// use licensechain::webhook::{HandlerStatus, SignatureAlgorithm, WebhookHandler, generate_signature};
///
/// let handler = WebhookHandler::new("whsec_test").unwrap();
/// let body = br#"{"type":"license.created","id":"lic_123"}"#;
/// let signature = generate_signature(body, "whsec_test", SignatureAlgorithm::Sha256);
///
/// let outcome = handler.handle(body, &signature, None, None);
/// let result = outcome.as_handled().unwrap();
/// assert_eq!(result.status, HandlerStatus::Processed);
/// assert_eq!(result.event, "license.created");
///
/// let tampered = br#"{"type":"license.created","id":"lic_999"}"#;
/// let outcome = handler.handle(tampered, &signature, None, None);
/// assert_eq!(
///     outcome.to_json(),
///     serde_json::json!({"valid": false, "error": "Invalid webhook signature"})
/// );
/// ```
#[derive(Debug)]
pub struct WebhookHandler {
    verifier: SignatureVerifier,
    guard: ReplayGuard,
    router: EventRouter,
}

impl WebhookHandler {
    /// Handler with the default router, tolerance and algorithm.
    pub fn new(secret: impl Into<String>) -> Result<Self, WebhookError> {
        Ok(WebhookHandler {
            verifier: SignatureVerifier::new(secret)?,
            guard: ReplayGuard::default(),
            router: EventRouter::new(),
        })
    }

    pub fn with_tolerance(self, tolerance: Duration) -> Self {
        WebhookHandler {
            guard: ReplayGuard::new(tolerance).require_timestamp(self.guard.requires_timestamp()),
            ..self
        }
    }

    /// Rejects deliveries carrying no timestamp, in the headers or the payload.
    pub fn require_timestamp(self, require_timestamp: bool) -> Self {
        WebhookHandler {
            guard: self.guard.require_timestamp(require_timestamp),
            ..self
        }
    }

    /// Algorithm used when a call does not name one.
    pub fn with_algorithm(self, algorithm: SignatureAlgorithm) -> Self {
        WebhookHandler {
            verifier: self.verifier.with_algorithm(algorithm),
            ..self
        }
    }

    pub fn with_router(self, router: EventRouter) -> Self {
        WebhookHandler { router, ..self }
    }

    /// The router, for registering handlers.
    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub fn handle(
        &self,
        raw_body: &[u8],
        signature: &str,
        timestamp: Option<&str>,
        algorithm: Option<SignatureAlgorithm>,
    ) -> WebhookOutcome {
        self.handle_at(raw_body, signature, timestamp, algorithm, Utc::now())
    }

    pub fn handle_delivery(&self, delivery: &WebhookDelivery) -> WebhookOutcome {
        self.handle(
            &delivery.raw_body,
            &delivery.signature,
            delivery.timestamp.as_deref(),
            None,
        )
    }

    /// Like [`handle`](Self::handle), checking freshness against `now`.
    pub fn handle_at(
        &self,
        raw_body: &[u8],
        signature: &str,
        timestamp: Option<&str>,
        algorithm: Option<SignatureAlgorithm>,
        now: DateTime<Utc>,
    ) -> WebhookOutcome {
        match self.process(raw_body, signature, timestamp, algorithm, now) {
            Ok(result) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "Webhook handled: event='{}', status='{}'",
                    result.event,
                    result.status
                );

                WebhookOutcome::Handled(result)
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Webhook rejected: {err}");

                WebhookOutcome::Rejected(err)
            }
        }
    }

    fn process(
        &self,
        raw_body: &[u8],
        signature: &str,
        timestamp: Option<&str>,
        algorithm: Option<SignatureAlgorithm>,
        now: DateTime<Utc>,
    ) -> Result<HandlerResult, WebhookError> {
        let algorithm = algorithm.unwrap_or(self.verifier.algorithm());
        if !self.verifier.verify_with(raw_body, signature, algorithm) {
            return Err(WebhookError::InvalidSignature);
        }

        let timestamp = timestamp.filter(|ts| !ts.trim().is_empty());
        if timestamp.is_some() {
            self.guard.check(timestamp, now)?;
        }

        let payload: AnyJson = serde_json::from_slice(raw_body)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        // Without a delivery timestamp, fall back to the payload's creation time.
        if timestamp.is_none() {
            self.guard.check(created_at(&payload).as_deref(), now)?;
        }

        let event = VerifiedEvent::from_payload(&payload)?;

        self.router
            .dispatch(&event)
            .map_err(|e| WebhookError::Handler(e.to_string()))
    }
}
