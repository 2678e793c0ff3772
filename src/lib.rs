//! # LicenseChain
//!
//! Typed client SDK for the LicenseChain licensing API.
//!
//! The crate has two halves that share configuration, error and validation types:
//!
//! - an **outbound** request pipeline with retries, exponential backoff and typed
//!   error classification, wrapped by one service per resource (licenses, users,
//!   products, webhook endpoints);
//! - an **inbound** webhook engine that authenticates deliveries with HMAC, rejects
//!   stale ones, and routes the verified event to a registered handler.
//!
//! ## Core Components Overview
//!
//! - **[`client`]**: [`LicenseChainClient`](client::LicenseChainClient), the resource
//!   services and the shared [`ApiClient`](client::ApiClient). Requires the `client`
//!   feature (on by default).
//! - **[`webhook`]**: signature verification, replay protection, event routing and the
//!   [`WebhookHandler`](webhook::WebhookHandler) pipeline. Needs no HTTP stack.
//! - **[`config`]**: immutable client [`Configuration`](config::Configuration).
//! - **[`errors`]**: [`ApiError`](errors::ApiError) for outbound calls and
//!   [`WebhookError`](errors::WebhookError) for rejected deliveries.
//! - **[`validation`]**: input checks and sanitization applied before any request.
//! - **[`types`]**: pagination parameters, list pages and shared aliases.
//!
//! ## Calling the API
//!
//! ```no_run
//! use licensechain::{
//!     client::{LicenseChainClient, NewUser},
//!     config::Configuration,
//!     errors::ApiError,
//!     types::ListParams,
//! };
//!
//! # async fn run() -> licensechain::errors::Result<()> {
//! let client = LicenseChainClient::new(Configuration::new("lc_live_key"))?;
//!
//! let user = client
//!     .users()
//!     .create(NewUser::builder().email("ada@example.com").name("Ada").build())
//!     .await?;
//!
//! let page = client
//!     .licenses()
//!     .list_for_user(&user.id, &ListParams::builder().limit(50).build())
//!     .await?;
//!
//! match client.licenses().get("550e8400-e29b-41d4-a716-446655440000").await {
//!     Ok(license) => println!("{license:?}"),
//!     Err(ApiError::NotFound(details)) => println!("missing: {details}"),
//!     Err(err) => return Err(err),
//! }
//! # let _ = page;
//! # Ok(())
//! # }
//! ```
//!
//! ## Receiving Webhooks
//!
//! ```
//! use licensechain::webhook::{SignatureAlgorithm, WebhookHandler, generate_signature};
//!
//! let handler = WebhookHandler::new("whsec_test").unwrap();
//!
//! let body = br#"{"type":"license.created","id":"lic_123"}"#;
//! let signature = generate_signature(body, "whsec_test", SignatureAlgorithm::Sha256);
//!
//! let outcome = handler.handle(body, &signature, None, None);
//! assert!(outcome.is_valid());
//! ```
//!
//! ## Features
//!
//! - `client` (default): the HTTP client, backed by `reqwest` and `tokio`.
//! - `tracing` (default): emit `tracing` events for requests, retries and rejected
//!   deliveries.

pub mod config;
pub mod errors;
pub mod types;
pub mod validation;
pub mod webhook;

#[cfg(feature = "client")]
pub mod client;
