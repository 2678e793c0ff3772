//! Input validation and sanitization applied before any request leaves the SDK.

use rand::Rng;

use crate::{
    errors::{ApiError, Result},
    types::{AnyJson, Record},
};

/// Page size used when a list call does not specify one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page size the API accepts.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Length of a license key.
pub const LICENSE_KEY_LENGTH: usize = 32;

/// Currencies accepted for product pricing.
pub const SUPPORTED_CURRENCIES: [&str; 8] = ["USD", "EUR", "GBP", "CAD", "AUD", "JPY", "CHF", "CNY"];

const LICENSE_KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const MAX_EMAIL_LENGTH: usize = 254;

/// Checks for a hyphenated RFC 4122 UUID (versions 1 through 5), in either case.
///
/// ```
/// use licensechain::validation::is_valid_uuid;
///
/// assert!(is_valid_uuid("550e8400-e29b-41d4-a716-446655440000"));
/// assert!(!is_valid_uuid("not-a-uuid"));
/// ```
pub fn is_valid_uuid(value: &str) -> bool {
    // `Uuid::try_parse` also accepts the simple, braced and URN forms.
    if value.len() != 36 {
        return false;
    }

    match uuid::Uuid::try_parse(value) {
        Ok(parsed) => {
            (1..=5).contains(&parsed.get_version_num())
                && parsed.get_variant() == uuid::Variant::RFC4122
        }
        Err(_) => false,
    }
}

/// Checks for a 32 character key made of uppercase letters and digits.
pub fn is_valid_license_key(key: &str) -> bool {
    key.len() == LICENSE_KEY_LENGTH
        && key
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Practical email check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH || email.contains(char::is_whitespace)
    {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with(['.', '-'])
        && !domain.ends_with(['.', '-'])
}

/// Checks a currency code against [`SUPPORTED_CURRENCIES`], ignoring case.
pub fn is_valid_currency(currency: &str) -> bool {
    let upper = currency.to_ascii_uppercase();
    SUPPORTED_CURRENCIES.contains(&upper.as_str())
}

/// Clamps pagination input: page is at least 1, limit lies in `1..=100`.
pub fn clamp_pagination(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);
    (page, limit)
}

/// Escapes the HTML-significant characters `& < > " '`.
pub fn sanitize_input(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escapes every string leaf of a metadata map, recursing into objects and arrays.
///
/// Keys and non-string leaves are left untouched.
pub fn sanitize_metadata(metadata: &Record<AnyJson>) -> Record<AnyJson> {
    metadata
        .iter()
        .map(|(key, value)| (key.clone(), sanitize_value(value)))
        .collect()
}

fn sanitize_value(value: &AnyJson) -> AnyJson {
    match value {
        AnyJson::String(s) => AnyJson::String(sanitize_input(s)),
        AnyJson::Array(items) => AnyJson::Array(items.iter().map(sanitize_value).collect()),
        AnyJson::Object(map) => AnyJson::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), sanitize_value(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Generates a random license key in the format accepted by [`is_valid_license_key`].
pub fn generate_license_key() -> String {
    let mut rng = rand::rng();
    (0..LICENSE_KEY_LENGTH)
        .map(|_| LICENSE_KEY_ALPHABET[rng.random_range(0..LICENSE_KEY_ALPHABET.len())] as char)
        .collect()
}

/// Fails with a validation error when `value` is empty or only whitespace.
pub fn require_not_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Fails with a validation error unless `value` is a non-empty UUID.
pub fn require_uuid(value: &str, field: &str) -> Result<()> {
    require_not_empty(value, field)?;
    if !is_valid_uuid(value) {
        return Err(ApiError::validation(format!("Invalid {field} format")));
    }
    Ok(())
}

/// Fails with a validation error unless `value` is a finite number above zero.
pub fn require_positive(value: f64, field: &str) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ApiError::validation(format!("{field} must be positive")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_uuid_validation() {
        assert!(is_valid_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_valid_uuid("550E8400-E29B-41D4-A716-446655440000"));
        assert!(is_valid_uuid("6ba7b810-9dad-11d1-80b4-00c04fd430c8"));

        assert!(!is_valid_uuid("not-a-uuid"));
        assert!(!is_valid_uuid(""));
        // simple form without hyphens
        assert!(!is_valid_uuid("550e8400e29b41d4a716446655440000"));
        // version 0 and version 7 are outside the accepted range
        assert!(!is_valid_uuid("550e8400-e29b-01d4-a716-446655440000"));
        assert!(!is_valid_uuid("550e8400-e29b-71d4-a716-446655440000"));
        // non-RFC 4122 variant nibble
        assert!(!is_valid_uuid("550e8400-e29b-41d4-c716-446655440000"));
        assert!(!is_valid_uuid("{550e8400-e29b-41d4-a716-44665544000}"));
    }

    #[test]
    fn test_license_key_validation() {
        let valid = "ABCDEFGHIJKLMNOPQRSTUVWXYZ012345";
        assert_eq!(valid.len(), 32);
        assert!(is_valid_license_key(valid));

        assert!(!is_valid_license_key(&valid[..31]));
        assert!(!is_valid_license_key("abcdefghijklmnopqrstuvwxyz012345"));
        assert!(!is_valid_license_key("ABCDEFGHIJKLMNOPQRSTUVWXYZ01234-"));
    }

    #[test]
    fn test_generated_license_keys_are_valid() {
        for _ in 0..16 {
            assert!(is_valid_license_key(&generate_license_key()));
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("user"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user @example.com"));
        assert!(!is_valid_email("user@.example.com"));
    }

    #[test]
    fn test_currency_validation() {
        assert!(is_valid_currency("USD"));
        assert!(is_valid_currency("eur"));
        assert!(!is_valid_currency("XYZ"));
        assert!(!is_valid_currency(""));
    }

    #[test]
    fn test_clamp_pagination() {
        assert_eq!(clamp_pagination(None, None), (1, 20));
        assert_eq!(clamp_pagination(Some(0), Some(0)), (1, 1));
        assert_eq!(clamp_pagination(Some(3), Some(250)), (3, 100));
        assert_eq!(clamp_pagination(Some(2), Some(50)), (2, 50));
    }

    #[test]
    fn test_sanitize_metadata_escapes_nested_strings() {
        let mut metadata = Record::new();
        metadata.insert("name".to_string(), json!("<script>alert('x')</script>"));
        metadata.insert("seats".to_string(), json!(5));
        metadata.insert(
            "nested".to_string(),
            json!({"note": "a & b", "tags": ["\"quoted\"", 1]}),
        );

        let sanitized = sanitize_metadata(&metadata);

        assert_eq!(
            sanitized["name"],
            json!("&lt;script&gt;alert(&#039;x&#039;)&lt;/script&gt;")
        );
        assert_eq!(sanitized["seats"], json!(5));
        assert_eq!(
            sanitized["nested"],
            json!({"note": "a &amp; b", "tags": ["&quot;quoted&quot;", 1]})
        );
    }

    #[test]
    fn test_require_helpers() {
        assert!(require_not_empty("value", "field").is_ok());

        let err = require_not_empty("   ", "user_id").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "user_id cannot be empty");

        let err = require_uuid("abc", "license_id").unwrap_err();
        assert_eq!(err.message(), "Invalid license_id format");

        assert!(require_positive(9.99, "price").is_ok());
        assert!(require_positive(0.0, "price").is_err());
        assert!(require_positive(f64::NAN, "price").is_err());
    }
}
