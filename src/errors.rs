//! Error types for the LicenseChain SDK.
//!
//! [`ApiError`] is returned by every outbound operation and is produced either by
//! local input validation or by classifying an API response. [`WebhookError`]
//! describes why an inbound webhook delivery was rejected.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::types::{AnyJson, Record, string_field};

/// Message used when an error response carries neither `error` nor `message`.
const FALLBACK_MESSAGE: &str = "Unknown error";

/// Fields shared by every [`ApiError`] variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorDetails {
    /// Human-readable description.
    pub message: String,
    /// Provider-supplied error code, if any.
    pub code: Option<String>,
    /// HTTP status of the response that produced the error.
    pub status_code: Option<u16>,
    /// Raw response fields kept for debugging.
    pub details: Record<AnyJson>,
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorDetails {
            message: message.into(),
            ..Default::default()
        }
    }
}

impl Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Rate limit metadata reported alongside an HTTP 429.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    /// Seconds to wait before retrying.
    pub retry_after: Option<u64>,
    /// Requests allowed per window.
    pub limit: Option<u64>,
    /// Requests left in the current window.
    pub remaining: Option<u64>,
    /// Unix time at which the window resets.
    pub reset: Option<u64>,
}

impl RateLimitInfo {
    fn from_body(body: &AnyJson) -> Self {
        RateLimitInfo {
            retry_after: u64_field(body, "retry_after"),
            limit: u64_field(body, "limit"),
            remaining: u64_field(body, "remaining"),
            reset: u64_field(body, "reset"),
        }
    }
}

/// The kind of an [`ApiError`], for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    NotFound,
    RateLimit,
    Server,
    Network,
    Unknown,
}

/// Errors returned by API operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// Invalid input, rejected locally or by the API. Never retried.
    #[error("Validation error: {0}")]
    Validation(ErrorDetails),

    /// Missing, invalid or insufficient credentials. Never retried.
    #[error("Authentication error: {0}")]
    Authentication(ErrorDetails),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(ErrorDetails),

    /// Too many requests; retried automatically before being surfaced.
    #[error("Rate limit exceeded: {details}")]
    RateLimit {
        info: RateLimitInfo,
        details: ErrorDetails,
    },

    /// Upstream failure (5xx).
    #[error("Server error: {0}")]
    Server(ErrorDetails),

    /// Transport failure, including timeouts and exhausted retries.
    #[error("Network error: {0}")]
    Network(ErrorDetails),

    /// Any response that does not fit the other kinds.
    #[error("Unknown error: {0}")]
    Unknown(ErrorDetails),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(ErrorDetails::new(message))
    }

    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network(ErrorDetails::new(message))
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        ApiError::Unknown(ErrorDetails::new(message))
    }

    /// Classifies a non-success HTTP response.
    ///
    /// The message is taken from the body's `error` field, then `message`, then a
    /// generic fallback. The body and the status code are kept in
    /// [`details`](ErrorDetails::details).
    ///
    /// ```
    /// use licensechain::errors::{ApiError, ErrorKind};
    ///
    /// let err = ApiError::from_response(404, &serde_json::json!({"error": "License not found"}));
    /// assert_eq!(err.kind(), ErrorKind::NotFound);
    /// assert_eq!(err.message(), "License not found");
    /// assert_eq!(err.status_code(), Some(404));
    /// ```
    pub fn from_response(status: u16, body: &AnyJson) -> Self {
        let message = ["error", "message"]
            .iter()
            .find_map(|key| body.get(key).and_then(AnyJson::as_str))
            .unwrap_or(FALLBACK_MESSAGE)
            .to_string();

        let mut details: Record<AnyJson> = match body {
            AnyJson::Object(map) => map.clone().into_iter().collect(),
            AnyJson::Null => Record::new(),
            other => Record::from([("body".to_string(), other.clone())]),
        };
        details.insert("status_code".to_string(), AnyJson::from(status));

        let error_details = ErrorDetails {
            message,
            code: string_field(body, "code"),
            status_code: Some(status),
            details,
        };

        match status {
            400 => ApiError::Validation(error_details),
            401 | 403 => ApiError::Authentication(error_details),
            404 => ApiError::NotFound(error_details),
            429 => ApiError::RateLimit {
                info: RateLimitInfo::from_body(body),
                details: error_details,
            },
            500 | 502 | 503 | 504 => ApiError::Server(error_details),
            400..=499 => ApiError::Validation(error_details),
            500..=599 => ApiError::Server(error_details),
            _ => ApiError::Unknown(error_details),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Authentication(_) => ErrorKind::Authentication,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::RateLimit { .. } => ErrorKind::RateLimit,
            ApiError::Server(_) => ErrorKind::Server,
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn error_details(&self) -> &ErrorDetails {
        match self {
            ApiError::Validation(d)
            | ApiError::Authentication(d)
            | ApiError::NotFound(d)
            | ApiError::Server(d)
            | ApiError::Network(d)
            | ApiError::Unknown(d) => d,
            ApiError::RateLimit { details, .. } => details,
        }
    }

    pub(crate) fn error_details_mut(&mut self) -> &mut ErrorDetails {
        match self {
            ApiError::Validation(d)
            | ApiError::Authentication(d)
            | ApiError::NotFound(d)
            | ApiError::Server(d)
            | ApiError::Network(d)
            | ApiError::Unknown(d) => d,
            ApiError::RateLimit { details, .. } => details,
        }
    }

    pub fn message(&self) -> &str {
        &self.error_details().message
    }

    pub fn code(&self) -> Option<&str> {
        self.error_details().code.as_deref()
    }

    pub fn status_code(&self) -> Option<u16> {
        self.error_details().status_code
    }

    pub fn details(&self) -> &Record<AnyJson> {
        &self.error_details().details
    }

    /// Rate limit metadata, for [`ApiError::RateLimit`] only.
    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        match self {
            ApiError::RateLimit { info, .. } => Some(info),
            _ => None,
        }
    }

    /// Whether the request pipeline retries this kind of failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimit | ErrorKind::Server | ErrorKind::Network
        )
    }

    /// JSON representation: `message`, `code`, `status_code`, `details`, and the
    /// rate limit fields for rate limit errors.
    pub fn to_json(&self) -> AnyJson {
        let d = self.error_details();
        let mut json = serde_json::json!({
            "message": d.message,
            "code": d.code,
            "status_code": d.status_code,
            "details": d.details,
        });

        if let (Some(info), AnyJson::Object(map)) = (self.rate_limit(), &mut json) {
            map.insert("retry_after".to_string(), AnyJson::from(info.retry_after));
            map.insert("limit".to_string(), AnyJson::from(info.limit));
            map.insert("remaining".to_string(), AnyJson::from(info.remaining));
            map.insert("reset".to_string(), AnyJson::from(info.reset));
        }

        json
    }
}

/// Reasons an inbound webhook delivery is rejected.
///
/// The display strings are the `error` texts reported by
/// [`WebhookOutcome`](crate::webhook::WebhookOutcome).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook secret is required")]
    MissingSecret,

    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Webhook timestamp is too old")]
    StaleTimestamp,

    #[error("Webhook timestamp is missing")]
    MissingTimestamp,

    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(String),

    /// A registered handler failed; carries the handler's message verbatim.
    #[error("{0}")]
    Handler(String),
}

/// A specialized `Result` type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

fn u64_field(body: &AnyJson, key: &str) -> Option<u64> {
    match body.get(key)? {
        AnyJson::Number(n) => n.as_u64(),
        AnyJson::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_status_classification() {
        let body = json!({"error": "boom"});
        let cases = [
            (400, ErrorKind::Validation),
            (401, ErrorKind::Authentication),
            (403, ErrorKind::Authentication),
            (404, ErrorKind::NotFound),
            (409, ErrorKind::Validation),
            (422, ErrorKind::Validation),
            (429, ErrorKind::RateLimit),
            (500, ErrorKind::Server),
            (502, ErrorKind::Server),
            (503, ErrorKind::Server),
            (504, ErrorKind::Server),
            (507, ErrorKind::Server),
            (302, ErrorKind::Unknown),
            (600, ErrorKind::Unknown),
        ];

        for (status, kind) in cases {
            let err = ApiError::from_response(status, &body);
            assert_eq!(err.kind(), kind, "status {status}");
            assert_eq!(err.status_code(), Some(status));
        }
    }

    #[test]
    fn test_message_precedence() {
        let both = ApiError::from_response(400, &json!({"error": "e", "message": "m"}));
        assert_eq!(both.message(), "e");

        let message_only = ApiError::from_response(400, &json!({"message": "m"}));
        assert_eq!(message_only.message(), "m");

        let neither = ApiError::from_response(400, &json!({"detail": "x"}));
        assert_eq!(neither.message(), "Unknown error");

        let not_json = ApiError::from_response(500, &AnyJson::Null);
        assert_eq!(not_json.message(), "Unknown error");
    }

    #[test]
    fn test_details_retain_body_and_status() {
        let err = ApiError::from_response(
            422,
            &json!({"error": "Invalid email", "code": "INVALID_EMAIL", "field": "email"}),
        );

        assert_eq!(err.code(), Some("INVALID_EMAIL"));
        assert_eq!(err.details()["field"], json!("email"));
        assert_eq!(err.details()["status_code"], json!(422));
        assert_eq!(err.to_string(), "Validation error: Invalid email");
    }

    #[test]
    fn test_rate_limit_metadata() {
        let err = ApiError::from_response(
            429,
            &json!({
                "error": "Too many requests",
                "retry_after": 30,
                "limit": 100,
                "remaining": "0",
                "reset": 1700000000u64,
            }),
        );

        let info = err.rate_limit().expect("rate limit info");
        assert_eq!(info.retry_after, Some(30));
        assert_eq!(info.limit, Some(100));
        assert_eq!(info.remaining, Some(0));
        assert_eq!(info.reset, Some(1_700_000_000));

        let json = err.to_json();
        assert_eq!(json["retry_after"], json!(30));
        assert_eq!(json["status_code"], json!(429));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ApiError::network("down").is_retryable());
        assert!(ApiError::from_response(503, &AnyJson::Null).is_retryable());
        assert!(!ApiError::validation("bad").is_retryable());
        assert!(!ApiError::from_response(401, &AnyJson::Null).is_retryable());
        assert!(!ApiError::from_response(404, &AnyJson::Null).is_retryable());
    }

    #[test]
    fn test_webhook_error_messages() {
        assert_eq!(
            WebhookError::InvalidSignature.to_string(),
            "Invalid webhook signature"
        );
        assert_eq!(
            WebhookError::StaleTimestamp.to_string(),
            "Webhook timestamp is too old"
        );
        assert_eq!(
            WebhookError::Handler("handler exploded".to_string()).to_string(),
            "handler exploded"
        );
    }
}
