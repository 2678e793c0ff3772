use std::sync::Arc;

use bon::Builder;
use chrono::{DateTime, SecondsFormat, Utc};
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{resource_path, update_body};
use crate::{
    client::{ApiClient, api::decode},
    errors::{ApiError, Result},
    types::{AnyJson, ListParams, Page, Record},
    validation::{require_not_empty, require_uuid, sanitize_metadata},
    webhook::parse_timestamp,
};

const SECONDS_PER_DAY: i64 = 86_400;

/// A license as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    #[serde(default, alias = "license_key")]
    pub key: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub usage_count: Option<u64>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub metadata: Option<Record<AnyJson>>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Record<AnyJson>,
}

impl License {
    /// Parsed expiry, if present and well-formed.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .as_deref()
            .and_then(|raw| parse_timestamp(raw).ok())
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features
            .as_ref()
            .is_some_and(|features| features.iter().any(|f| f == feature))
    }

    /// A metadata value rendered as a string.
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        match self.metadata.as_ref()?.get(key)? {
            AnyJson::String(s) => Some(s.clone()),
            AnyJson::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Input for [`LicenseService::create`].
#[derive(Builder, Debug, Clone, PartialEq, Serialize)]
pub struct NewLicense {
    #[builder(into)]
    pub user_id: String,
    #[builder(into)]
    pub product_id: String,
    #[builder(default)]
    pub metadata: Record<AnyJson>,
}

/// Response of `POST /licenses/validate` with an application scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseValidation {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub license: Option<License>,
    #[serde(default)]
    pub user: Option<AnyJson>,
    #[serde(default)]
    pub app: Option<AnyJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Extra conditions applied on top of a successful validation.
///
/// Each rule is skipped when the license lacks the field it inspects.
#[derive(Builder, Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationRules {
    pub max_usage: Option<u64>,
    pub allowed_features: Option<Vec<String>>,
    pub required_features: Option<Vec<String>>,
    /// Checked against the license metadata `domain`.
    pub allowed_domains: Option<Vec<String>>,
    /// Checked against the license metadata `ip_address`.
    pub allowed_ips: Option<Vec<String>>,
}

impl LicenseValidation {
    pub fn invalid(error: impl Into<String>) -> Self {
        LicenseValidation {
            valid: false,
            license: None,
            user: None,
            app: None,
            error: Some(error.into()),
        }
    }

    /// Invalid results and results without a license count as expired, as do
    /// unreadable expiry dates. A license without an expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let Some(license) = self.license.as_ref().filter(|_| self.valid) else {
            return true;
        };

        match (&license.expires_at, license.expiry()) {
            (None, _) => false,
            (Some(_), Some(expiry)) => expiry < now,
            (Some(_), None) => true,
        }
    }

    /// Whole days until expiry, rounded up and floored at zero.
    pub fn days_until_expiration(&self, now: DateTime<Utc>) -> Option<i64> {
        let license = self.license.as_ref().filter(|_| self.valid)?;
        let seconds = (license.expiry()? - now).num_seconds();
        if seconds <= 0 {
            return Some(0);
        }
        Some((seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY)
    }

    /// The license of a valid result, or a validation error carrying the reason.
    pub fn into_license(self) -> Result<License> {
        match self {
            LicenseValidation {
                valid: true,
                license: Some(license),
                ..
            } => Ok(license),
            LicenseValidation { error, .. } => Err(ApiError::validation(
                error.unwrap_or_else(|| "License is not valid".to_string()),
            )),
        }
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.valid && self.license.as_ref().is_some_and(|l| l.has_feature(feature))
    }

    /// Applies `rules`, returning a copy marked invalid on the first failure.
    ///
    /// ```
    /// use licensechain::client::{LicenseValidation, ValidationRules};
    ///
    /// let validation: LicenseValidation = serde_json::from_value(serde_json::json!({
    ///     "valid": true,
    ///     "license": {"id": "lic_1", "features": ["export", "sso"], "usage_count": 3},
    /// })).unwrap();
    ///
    /// let rules = ValidationRules::builder()
    ///     .required_features(vec!["audit".to_string()])
    ///     .build();
    ///
    /// let checked = validation.check(&rules);
    /// assert!(!checked.valid);
    /// assert_eq!(checked.error.as_deref(), Some("Missing required features: audit"));
    /// ```
    pub fn check(&self, rules: &ValidationRules) -> LicenseValidation {
        match (self.valid, &self.license) {
            (true, Some(license)) => match rule_violation(license, rules) {
                Some(error) => LicenseValidation {
                    valid: false,
                    error: Some(error),
                    ..self.clone()
                },
                None => self.clone(),
            },
            _ => self.clone(),
        }
    }
}

fn rule_violation(license: &License, rules: &ValidationRules) -> Option<String> {
    if let (Some(max_usage), Some(usage)) = (rules.max_usage, license.usage_count) {
        if usage > max_usage {
            return Some("Usage limit exceeded".to_string());
        }
    }

    if let (Some(allowed), Some(features)) = (&rules.allowed_features, &license.features) {
        let invalid: Vec<_> = features
            .iter()
            .filter(|f| !allowed.contains(*f))
            .map(String::as_str)
            .collect();
        if !invalid.is_empty() {
            return Some(format!("Invalid features: {}", invalid.join(", ")));
        }
    }

    if let (Some(required), Some(features)) = (&rules.required_features, &license.features) {
        let missing: Vec<_> = required
            .iter()
            .filter(|f| !features.contains(*f))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Some(format!("Missing required features: {}", missing.join(", ")));
        }
    }

    if let (Some(allowed), Some(domain)) = (&rules.allowed_domains, license.metadata_str("domain")) {
        if !allowed.contains(&domain) {
            return Some(format!("Domain not allowed: {domain}"));
        }
    }

    if let (Some(allowed), Some(ip)) = (&rules.allowed_ips, license.metadata_str("ip_address")) {
        if !allowed.contains(&ip) {
            return Some(format!("IP address not allowed: {ip}"));
        }
    }

    None
}

/// License operations.
#[derive(Debug, Clone)]
pub struct LicenseService {
    api: Arc<ApiClient>,
}

impl LicenseService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        LicenseService { api }
    }

    pub async fn create(&self, license: NewLicense) -> Result<License> {
        require_not_empty(&license.user_id, "user_id")?;
        require_not_empty(&license.product_id, "product_id")?;

        let body = NewLicense {
            metadata: sanitize_metadata(&license.metadata),
            ..license
        };
        self.api.send_data(Method::POST, "/licenses", &body).await
    }

    pub async fn get(&self, license_id: &str) -> Result<License> {
        let path = resource_path("/licenses", license_id, "license_id")?;
        self.api.get_data(&path, &[]).await
    }

    pub async fn update(&self, license_id: &str, updates: &Record<AnyJson>) -> Result<License> {
        let path = resource_path("/licenses", license_id, "license_id")?;
        self.api
            .send_data(Method::PUT, &path, &update_body(updates))
            .await
    }

    /// Revokes a license by deleting it.
    pub async fn delete(&self, license_id: &str) -> Result<()> {
        let path = resource_path("/licenses", license_id, "license_id")?;
        self.api.delete(&path).await?;
        Ok(())
    }

    /// Revokes a license, keeping the record and an optional reason.
    pub async fn revoke_with_reason(&self, license_id: &str, reason: Option<&str>) -> Result<()> {
        let path = resource_path("/licenses", license_id, "license_id")?;
        let body = match reason.filter(|r| !r.trim().is_empty()) {
            Some(reason) => json!({ "reason": reason }),
            None => json!({}),
        };
        self.api.patch(&format!("{path}/revoke"), Some(&body)).await?;
        Ok(())
    }

    pub async fn activate(&self, license_id: &str) -> Result<()> {
        let path = resource_path("/licenses", license_id, "license_id")?;
        self.api.patch(&format!("{path}/activate"), None).await?;
        Ok(())
    }

    /// Moves the expiry to `expires_at`.
    pub async fn extend(&self, license_id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let path = resource_path("/licenses", license_id, "license_id")?;
        let body = json!({ "expires_at": expires_at.to_rfc3339_opts(SecondsFormat::Secs, true) });
        self.api.patch(&format!("{path}/extend"), Some(&body)).await?;
        Ok(())
    }

    /// Whether the API reports the key as valid.
    pub async fn validate(&self, license_key: &str) -> Result<bool> {
        require_not_empty(license_key, "license_key")?;

        let response = self
            .api
            .post(
                "/licenses/validate",
                Some(&json!({ "license_key": license_key })),
            )
            .await?;
        Ok(response
            .get("valid")
            .and_then(AnyJson::as_bool)
            .unwrap_or(false))
    }

    /// Full validation result, optionally scoped to an application.
    pub async fn validate_key(
        &self,
        license_key: &str,
        app_id: Option<&str>,
    ) -> Result<LicenseValidation> {
        require_not_empty(license_key, "license_key")?;

        let mut body = json!({ "license_key": license_key });
        if let Some(app_id) = app_id.filter(|id| !id.is_empty()) {
            body["app_id"] = AnyJson::from(app_id);
        }

        let response = self.api.post("/licenses/validate", Some(&body)).await?;
        decode(response)
    }

    /// Validates the key, then applies `rules` to the result.
    ///
    /// API failures are folded into an invalid result carrying the error message.
    pub async fn validate_with_rules(
        &self,
        license_key: &str,
        app_id: Option<&str>,
        rules: &ValidationRules,
    ) -> LicenseValidation {
        match self.validate_key(license_key, app_id).await {
            Ok(validation) => validation.check(rules),
            Err(err) => LicenseValidation::invalid(err.message()),
        }
    }

    pub async fn list(&self, params: &ListParams) -> Result<Page<License>> {
        self.api.get_json("/licenses", &params.query_pairs()).await
    }

    pub async fn list_for_user(&self, user_id: &str, params: &ListParams) -> Result<Page<License>> {
        require_uuid(user_id, "user_id")?;
        let params = params.clone().filter("user_id", user_id);
        self.api.get_json("/licenses", &params.query_pairs()).await
    }

    pub async fn stats(&self) -> Result<Record<AnyJson>> {
        self.api.get_data("/licenses/stats", &[]).await
    }
}
