//! Typed resource services over the shared request pipeline.
//!
//! Every operation validates its inputs before any I/O, so a malformed
//! identifier or missing field fails with [`ApiError::Validation`](crate::errors::ApiError::Validation)
//! without reaching the network.

mod analytics;
mod app;
mod license;
mod product;
mod user;
mod webhook;

pub use analytics::*;
pub use app::*;
pub use license::*;
pub use product::*;
pub use user::*;
pub use webhook::*;

use crate::{
    errors::Result,
    types::{AnyJson, Record},
    validation::{require_uuid, sanitize_metadata},
};

/// `"{collection}/{id}"` after checking `id` is a UUID.
fn resource_path(collection: &str, id: &str, field: &str) -> Result<String> {
    require_uuid(id, field)?;
    Ok(format!("{collection}/{id}"))
}

/// Sanitized update body.
fn update_body(updates: &Record<AnyJson>) -> AnyJson {
    AnyJson::Object(sanitize_metadata(updates).into_iter().collect())
}
