//! Timestamp window checks against replayed deliveries.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::errors::WebhookError;

/// Default tolerance between event creation and verification.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Parses a delivery timestamp.
///
/// Accepts integer epoch seconds, RFC 3339, and `YYYY-MM-DD HH:MM:SS` read as UTC.
///
/// ```
/// use licensechain::webhook::parse_timestamp;
///
/// let epoch = parse_timestamp("1700000000").unwrap();
/// let rfc3339 = parse_timestamp("2023-11-14T22:13:20Z").unwrap();
/// assert_eq!(epoch, rfc3339);
/// assert!(parse_timestamp("yesterday").is_err());
/// ```
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, WebhookError> {
    let value = value.trim();
    let invalid = || WebhookError::InvalidTimestamp(value.to_string());

    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        let seconds: i64 = value.parse().map_err(|_| invalid())?;
        return DateTime::from_timestamp(seconds, 0).ok_or_else(invalid);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| invalid())
}

/// Whether `event_time` lies within `tolerance` of `now`, in either direction.
///
/// The boundary is inclusive and differences are compared at millisecond precision.
pub fn is_fresh(event_time: DateTime<Utc>, now: DateTime<Utc>, tolerance: Duration) -> bool {
    let skew = u128::from((now - event_time).num_milliseconds().unsigned_abs());
    skew <= tolerance.as_millis()
}

/// Rejects deliveries whose timestamp falls outside the tolerance window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayGuard {
    tolerance: Duration,
    require_timestamp: bool,
}

impl Default for ReplayGuard {
    fn default() -> Self {
        ReplayGuard {
            tolerance: DEFAULT_TOLERANCE,
            require_timestamp: false,
        }
    }
}

impl ReplayGuard {
    pub fn new(tolerance: Duration) -> Self {
        ReplayGuard {
            tolerance,
            ..Default::default()
        }
    }

    /// When set, a delivery without any timestamp is rejected instead of accepted.
    pub fn require_timestamp(self, require_timestamp: bool) -> Self {
        ReplayGuard {
            require_timestamp,
            ..self
        }
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    pub fn requires_timestamp(&self) -> bool {
        self.require_timestamp
    }

    /// Checks an optional raw timestamp against `now`.
    pub fn check(&self, timestamp: Option<&str>, now: DateTime<Utc>) -> Result<(), WebhookError> {
        match timestamp {
            Some(raw) => {
                let event_time = parse_timestamp(raw)?;
                if is_fresh(event_time, now, self.tolerance) {
                    Ok(())
                } else {
                    Err(WebhookError::StaleTimestamp)
                }
            }
            None if self.require_timestamp => Err(WebhookError::MissingTimestamp),
            None => Ok(()),
        }
    }
}
