//! Miscellaneous common types used throughout the SDK.

use serde::{Deserialize, Serialize};

/// A string-keyed map, used for metadata, query filters and free-form API fields.
pub type Record<V> = std::collections::HashMap<String, V>;

/// Represents any JSON value. Used for serializing/deserializing arbitrary JSON data.
pub type AnyJson = serde_json::Value;

/// The `{"data": ...}` envelope wrapped around single-resource API responses.
///
/// ```
/// use licensechain::types::Envelope;
///
/// let envelope: Envelope<String> = serde_json::from_value(serde_json::json!({
///     "data": "lic_123",
///     "request_id": "req_1",
/// })).unwrap();
///
/// assert_eq!(envelope.data, "lic_123");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Reads a string field from a JSON object, accepting numbers as well.
///
/// Webhook producers and API responses are not consistent about whether
/// identifiers are strings or integers.
pub(crate) fn string_field(value: &AnyJson, key: &str) -> Option<String> {
    match value.get(key)? {
        AnyJson::String(s) => Some(s.clone()),
        AnyJson::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
