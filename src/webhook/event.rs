use std::{convert::Infallible, fmt::Display, str::FromStr};

use http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::{
    errors::WebhookError,
    types::{AnyJson, Record, string_field},
};

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "x-licensechain-signature";

/// Header carrying the delivery creation time.
pub const TIMESTAMP_HEADER: &str = "x-licensechain-timestamp";

/// Event type tag of a webhook delivery.
///
/// Unrecognized tags are kept as [`WebhookEventType::Other`] and are routed to the
/// fallback handler rather than rejected.
///
/// ```
/// use licensechain::webhook::WebhookEventType;
///
/// let known: WebhookEventType = "license.created".parse().unwrap();
/// assert_eq!(known, WebhookEventType::LicenseCreated);
///
/// let other: WebhookEventType = "invoice.sent".parse().unwrap();
/// assert_eq!(other.as_str(), "invoice.sent");
/// assert!(!other.is_known());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WebhookEventType {
    LicenseCreated,
    LicenseUpdated,
    LicenseRevoked,
    LicenseExpired,
    LicenseValidated,
    UserCreated,
    UserUpdated,
    UserDeleted,
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    AppCreated,
    AppUpdated,
    AppDeleted,
    PaymentCompleted,
    PaymentFailed,
    PaymentRefunded,
    Other(String),
}

impl WebhookEventType {
    /// Every recognized event type.
    pub const KNOWN: [WebhookEventType; 17] = [
        WebhookEventType::LicenseCreated,
        WebhookEventType::LicenseUpdated,
        WebhookEventType::LicenseRevoked,
        WebhookEventType::LicenseExpired,
        WebhookEventType::LicenseValidated,
        WebhookEventType::UserCreated,
        WebhookEventType::UserUpdated,
        WebhookEventType::UserDeleted,
        WebhookEventType::ProductCreated,
        WebhookEventType::ProductUpdated,
        WebhookEventType::ProductDeleted,
        WebhookEventType::AppCreated,
        WebhookEventType::AppUpdated,
        WebhookEventType::AppDeleted,
        WebhookEventType::PaymentCompleted,
        WebhookEventType::PaymentFailed,
        WebhookEventType::PaymentRefunded,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::LicenseCreated => "license.created",
            WebhookEventType::LicenseUpdated => "license.updated",
            WebhookEventType::LicenseRevoked => "license.revoked",
            WebhookEventType::LicenseExpired => "license.expired",
            WebhookEventType::LicenseValidated => "license.validated",
            WebhookEventType::UserCreated => "user.created",
            WebhookEventType::UserUpdated => "user.updated",
            WebhookEventType::UserDeleted => "user.deleted",
            WebhookEventType::ProductCreated => "product.created",
            WebhookEventType::ProductUpdated => "product.updated",
            WebhookEventType::ProductDeleted => "product.deleted",
            WebhookEventType::AppCreated => "app.created",
            WebhookEventType::AppUpdated => "app.updated",
            WebhookEventType::AppDeleted => "app.deleted",
            WebhookEventType::PaymentCompleted => "payment.completed",
            WebhookEventType::PaymentFailed => "payment.failed",
            WebhookEventType::PaymentRefunded => "payment.refunded",
            WebhookEventType::Other(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, WebhookEventType::Other(_))
    }
}

impl Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookEventType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(WebhookEventType::KNOWN
            .into_iter()
            .find(|known| known.as_str() == s)
            .unwrap_or_else(|| WebhookEventType::Other(s.to_string())))
    }
}

impl From<&str> for WebhookEventType {
    fn from(value: &str) -> Self {
        match value.parse() {
            Ok(event_type) => event_type,
            Err(never) => match never {},
        }
    }
}

impl From<String> for WebhookEventType {
    fn from(value: String) -> Self {
        WebhookEventType::from(value.as_str())
    }
}

impl From<WebhookEventType> for String {
    fn from(value: WebhookEventType) -> Self {
        match value {
            WebhookEventType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// One inbound delivery as received over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookDelivery {
    /// Body bytes exactly as received; the signature covers these.
    pub raw_body: Vec<u8>,
    pub signature: String,
    pub timestamp: Option<String>,
}

impl WebhookDelivery {
    pub fn new(raw_body: impl Into<Vec<u8>>, signature: impl Into<String>) -> Self {
        WebhookDelivery {
            raw_body: raw_body.into(),
            signature: signature.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(self, timestamp: impl Into<String>) -> Self {
        WebhookDelivery {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// Reads the signature and timestamp from the LicenseChain delivery headers.
    ///
    /// A missing signature header yields an empty signature, which never verifies.
    pub fn from_headers(headers: &HeaderMap, raw_body: impl Into<Vec<u8>>) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        WebhookDelivery {
            raw_body: raw_body.into(),
            signature: header(SIGNATURE_HEADER).unwrap_or_default(),
            timestamp: header(TIMESTAMP_HEADER),
        }
    }
}

/// A delivery that passed signature and freshness checks, normalized.
///
/// Only the webhook pipeline constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedEvent {
    id: String,
    event_type: WebhookEventType,
    created_at: Option<String>,
    data: AnyJson,
}

impl VerifiedEvent {
    /// Normalizes a parsed payload.
    ///
    /// Producers disagree on key spelling, so `type`/`event`, `created_at`/`createdAt`
    /// and `data`/`object` are all accepted. A payload without a type becomes
    /// `Other("unknown")`.
    pub(crate) fn from_payload(payload: &AnyJson) -> Result<Self, WebhookError> {
        if !payload.is_object() {
            return Err(WebhookError::InvalidPayload(
                "expected a JSON object".to_string(),
            ));
        }

        let event_type = first_string(payload, &["type", "event"])
            .map(WebhookEventType::from)
            .unwrap_or_else(|| WebhookEventType::Other("unknown".to_string()));

        let data = ["data", "object"]
            .iter()
            .find_map(|key| payload.get(key).filter(|value| !value.is_null()))
            .cloned()
            .unwrap_or_else(|| AnyJson::Object(Default::default()));

        Ok(VerifiedEvent {
            id: string_field(payload, "id").unwrap_or_default(),
            event_type,
            created_at: created_at(payload),
            data,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &WebhookEventType {
        &self.event_type
    }

    pub fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }

    pub fn data(&self) -> &AnyJson {
        &self.data
    }

    #[cfg(test)]
    pub(crate) fn for_test(event_type: WebhookEventType, data: AnyJson) -> Self {
        VerifiedEvent {
            id: "evt_test".to_string(),
            event_type,
            created_at: None,
            data,
        }
    }
}

/// The creation timestamp carried inside a payload, under either spelling.
pub(crate) fn created_at(payload: &AnyJson) -> Option<String> {
    first_string(payload, &["created_at", "createdAt"])
}

fn first_string(payload: &AnyJson, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string_field(payload, key))
}

/// Outcome status reported by a handler.
///
/// Handlers may report statuses of their own, such as `"queued"`, which are kept
/// as [`HandlerStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HandlerStatus {
    Processed,
    Ignored,
    Other(String),
}

impl HandlerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            HandlerStatus::Processed => "processed",
            HandlerStatus::Ignored => "ignored",
            HandlerStatus::Other(status) => status,
        }
    }
}

impl Display for HandlerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for HandlerStatus {
    fn from(value: &str) -> Self {
        match value {
            "processed" => HandlerStatus::Processed,
            "ignored" => HandlerStatus::Ignored,
            other => HandlerStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for HandlerStatus {
    fn from(value: String) -> Self {
        HandlerStatus::from(value.as_str())
    }
}

impl From<HandlerStatus> for String {
    fn from(value: HandlerStatus) -> Self {
        match value {
            HandlerStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

/// Record returned by an event handler: `{status, event, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResult {
    pub status: HandlerStatus,
    pub event: String,
    #[serde(flatten)]
    pub extra: Record<AnyJson>,
}

impl HandlerResult {
    pub fn new(status: impl Into<HandlerStatus>, event: impl Display) -> Self {
        HandlerResult {
            status: status.into(),
            event: event.to_string(),
            extra: Record::new(),
        }
    }

    pub fn processed(event: impl Display) -> Self {
        HandlerResult::new(HandlerStatus::Processed, event)
    }

    pub fn ignored(event: impl Display) -> Self {
        HandlerResult::new(HandlerStatus::Ignored, event)
    }

    /// Adds an extra field to the record.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<AnyJson>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
