//! Inbound webhook verification and dispatch.
//!
//! A delivery flows through [`SignatureVerifier`], then [`ReplayGuard`], then
//! [`EventRouter`]. [`WebhookHandler`] composes the three and always answers with a
//! [`WebhookOutcome`].
//!
//! ```
//! use licensechain::webhook::{
//!     HandlerError, HandlerResult, SignatureAlgorithm, VerifiedEvent, WebhookDelivery,
//!     WebhookEventType, WebhookHandler, generate_signature,
//! };
//!
//! let handler = WebhookHandler::new("whsec_test").unwrap();
//! handler.router().register(
//!     WebhookEventType::LicenseCreated,
//!     |event: &VerifiedEvent| -> Result<HandlerResult, HandlerError> {
//!         Ok(HandlerResult::processed(event.event_type()).with_field("license_id", event.id()))
//!     },
//! );
//!
//! let body = br#"{"type":"license.created","id":"lic_123"}"#;
//! let delivery = WebhookDelivery::new(
//!     body.to_vec(),
//!     generate_signature(body, "whsec_test", SignatureAlgorithm::Sha256),
//! );
//!
//! let outcome = handler.handle_delivery(&delivery);
//! assert_eq!(
//!     outcome.to_json(),
//!     serde_json::json!({"status": "processed", "event": "license.created", "license_id": "lic_123"})
//! );
//! ```

mod event;
mod pipeline;
mod replay;
mod router;
mod signature;

pub use event::*;
pub use pipeline::*;
pub use replay::*;
pub use router::*;
pub use signature::*;
